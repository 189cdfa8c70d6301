use super::*;

/// Bitcoin's difficulty-1 target, 0x00000000ffff << 208. Chains whose header
/// digest lives in a different space (Scrypt) reconcile against this same
/// constant through their share multiplier.
pub static DIFFICULTY_1_TARGET: LazyLock<U256> = LazyLock::new(|| {
    let mut bytes = [0u8; 32];
    bytes[4] = 0xff;
    bytes[5] = 0xff;
    U256::from_big_endian(&bytes)
});

/// A 256-bit upper bound on header hashes. A hash meets the target when,
/// interpreted as a little-endian unsigned integer, it is less than or equal
/// to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target(U256);

impl Target {
    pub const ZERO: Target = Target(U256::zero());

    pub fn from_compact(compact: CompactTarget) -> Self {
        let consensus = compact.to_consensus();
        let mantissa = U256::from(consensus & 0x007f_ffff);
        let exponent = (consensus >> 24) as usize;

        let value = if exponent <= 3 {
            mantissa >> (8 * (3 - exponent))
        } else {
            mantissa << (8 * (exponent - 3))
        };

        Self(value)
    }

    /// Parse a big-endian target hex string, the orientation
    /// `getblocktemplate` reports.
    pub fn from_be_hex(s: &str) -> Result<Self> {
        ensure!(s.len() == 64, "target hex must be 64 chars, got {}", s.len());
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(U256::from_big_endian(&bytes)))
    }

    /// Parse a little-endian target hex string, the orientation
    /// `createauxblock` reports.
    pub fn from_le_hex(s: &str) -> Result<Self> {
        ensure!(s.len() == 64, "target hex must be 64 chars, got {}", s.len());
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(U256::from_little_endian(&bytes)))
    }

    pub fn to_be_hex(self) -> String {
        hex::encode(self.0.to_big_endian())
    }

    pub fn from_difficulty(difficulty: f64) -> Result<Self> {
        ensure!(
            difficulty.is_finite() && difficulty > 0.0,
            "difficulty must be finite and > 0, got {difficulty}"
        );

        // Widen to 512 bits so the divisor can carry the full f64 mantissa:
        // target = (diff1 << 64) / (difficulty * 2^64).
        let numerator = U512::from(*DIFFICULTY_1_TARGET) << 64;
        let denominator = f64_to_u512(difficulty * 2f64.powi(64));

        if denominator.is_zero() {
            return Ok(Self(U256::MAX));
        }

        Ok(Self(
            U256::try_from(numerator / denominator).unwrap_or(U256::MAX),
        ))
    }

    /// The target a share must meet to be credited. The pool difficulty is
    /// scaled down by the chain's share multiplier before inverting, so a
    /// Scrypt chain at pool difficulty 65536 hands out difficulty-1 work.
    pub fn from_pool_difficulty(pool_difficulty: f64, share_multiplier: f64) -> Result<Self> {
        ensure!(
            share_multiplier > 0.0,
            "share multiplier must be > 0, got {share_multiplier}"
        );
        Self::from_difficulty(pool_difficulty / share_multiplier)
    }

    pub fn difficulty(self) -> f64 {
        if self.0.is_zero() {
            return f64::INFINITY;
        }
        u256_to_f64(*DIFFICULTY_1_TARGET) / u256_to_f64(self.0)
    }

    /// Equality counts as meeting the target.
    pub fn is_met_by(self, hash: Hash256) -> bool {
        U256::from_little_endian(hash.as_byte_array()) <= self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl From<Nbits> for Target {
    fn from(nbits: Nbits) -> Self {
        Self::from_compact(nbits.to_compact())
    }
}

fn u256_to_f64(value: U256) -> f64 {
    value
        .0
        .iter()
        .enumerate()
        .map(|(i, limb)| *limb as f64 * 2f64.powi(64 * i as i32))
        .sum()
}

fn f64_to_u512(value: f64) -> U512 {
    let bits = value.to_bits();
    let raw_exponent = (bits >> 52) & 0x7ff;
    let raw_mantissa = bits & 0x000f_ffff_ffff_ffff;

    let (mantissa, exponent) = if raw_exponent == 0 {
        (raw_mantissa, -1074i64)
    } else {
        (raw_mantissa | (1 << 52), raw_exponent as i64 - 1075)
    };

    let mantissa = U512::from(mantissa);

    if exponent >= 459 {
        // mantissa is 53 bits; anything this large saturates
        U512::MAX
    } else if exponent >= 0 {
        mantissa << exponent as usize
    } else if exponent <= -53 {
        U512::zero()
    } else {
        mantissa >> (-exponent) as usize
    }
}
