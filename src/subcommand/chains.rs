use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Chains {}

impl Chains {
    pub(crate) fn run(&self) -> Result {
        println!(
            "{:<16} {:<8} {:>12} {:>14}",
            "chain", "algo", "multiplier", "confirmations"
        );

        for chain in chain::chains() {
            println!(
                "{:<16} {:<8} {:>12} {:>14}",
                chain.name, chain.algorithm, chain.share_multiplier, chain.min_confirmations
            );
        }

        Ok(())
    }
}
