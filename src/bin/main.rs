fn main() {
    remora::main()
}
