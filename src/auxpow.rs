use super::*;

/// The proof handed to an auxiliary daemon alongside a winning hash: the
/// primary coinbase that commits to the aux chain, the primary header it was
/// mined under, and the two merkle branches linking them. Serialized as one
/// hex string in the field order `getauxblock` expects.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxPow {
    parent_coinbase: String,
    parent_header_hash: Hash256,
    parent_merkle_branch: Vec<Hash256>,
    aux_merkle_branch: Vec<Hash256>,
    aux_merkle_index: u32,
    parent_header: String,
}

impl AuxPow {
    pub fn new(
        parent_coinbase: String,
        parent_header: &[u8],
        parent_merkle_branch: Vec<Hash256>,
        aux_block: &AuxBlock,
    ) -> Self {
        Self {
            parent_coinbase,
            parent_header_hash: double_sha256(parent_header),
            parent_merkle_branch,
            aux_merkle_branch: aux_block.merkle_branch.clone(),
            aux_merkle_index: aux_block.merkle_index,
            parent_header: hex::encode(parent_header),
        }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();

        out.push_str(&self.parent_coinbase);
        out.push_str(&self.parent_header_hash.to_reversed_hex());

        // The coinbase is always the leftmost leaf, so the parent branch side
        // mask is zero.
        out.push_str(&var_uint(self.parent_merkle_branch.len() as u64));
        for sibling in &self.parent_merkle_branch {
            out.push_str(&sibling.to_hex());
        }
        out.push_str("00000000");

        out.push_str(&var_uint(self.aux_merkle_branch.len() as u64));
        for branch in &self.aux_merkle_branch {
            out.push_str(&branch.to_hex());
        }
        if self.aux_merkle_branch.is_empty() {
            out.push_str("00000000");
        } else {
            let mut mask = [0u8; 4];
            LittleEndian::write_u32(&mut mask, self.aux_merkle_index);
            out.push_str(&hex::encode(mask));
        }

        out.push_str(&self.parent_header);

        out
    }
}

pub fn var_uint(n: u64) -> String {
    hex::encode(bitcoin::consensus::serialize(&VarInt(n)))
}
