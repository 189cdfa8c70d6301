use super::*;

/// The verdict on one submitted share. A single header digest is compared
/// against three families of thresholds at once: the pool target decides
/// whether the share is credited, the primary network target whether it
/// solves the primary chain, and each aux network target whether it solves
/// that auxiliary chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub hash: Hash256,
    pub share_difficulty: f64,
    pub meets_pool: bool,
    pub primary_candidate: bool,
    pub aux_candidates: Vec<usize>,
}

impl Evaluation {
    pub fn is_block_candidate(&self) -> bool {
        self.primary_candidate || !self.aux_candidates.is_empty()
    }
}

/// Digest the header with the primary chain's header digest and weigh it.
/// Comparisons are ≤: a hash exactly on a target meets it.
pub fn evaluate(workbase: &Workbase, header: &[u8; 80]) -> Evaluation {
    let hash = (workbase.chain.header_digest)(header);

    let meets_pool = workbase.pool_target.is_met_by(hash);
    let share_difficulty = workbase.pool_target.difficulty();

    if !meets_pool {
        return Evaluation {
            hash,
            share_difficulty,
            meets_pool: false,
            primary_candidate: false,
            aux_candidates: Vec::new(),
        };
    }

    let primary_candidate = workbase.primary_target.is_met_by(hash);

    let aux_candidates = workbase
        .aux_blocks
        .iter()
        .zip(&workbase.aux_targets)
        .enumerate()
        .filter(|(_, (aux, target))| !aux.hash.is_zero() && target.is_met_by(hash))
        .map(|(index, _)| index)
        .collect();

    Evaluation {
        hash,
        share_difficulty,
        meets_pool,
        primary_candidate,
        aux_candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbase(pool_difficulty: f64, aux_count: usize) -> Workbase {
        let aux_blocks = (0..aux_count)
            .map(|i| crate::workbase::tests::sample_aux_block(0xa0 + i as u8))
            .collect();
        crate::workbase::tests::assemble(Vec::new(), aux_blocks, pool_difficulty)
    }

    fn force_targets(workbase: &mut Workbase, pool: Target, primary: Target, aux: Vec<Target>) {
        workbase.pool_target = pool;
        workbase.primary_target = primary;
        workbase.aux_targets = aux;
    }

    fn max_target() -> Target {
        Target::from_difficulty(f64::MIN_POSITIVE).unwrap()
    }

    #[test]
    fn hash_above_pool_target_is_invalid_and_checks_nothing_else() {
        let mut workbase = workbase(1.0, 1);
        // pool target zero: only an all-zero hash could meet it
        force_targets(&mut workbase, Target::ZERO, max_target(), vec![max_target()]);

        let evaluation = evaluate(&workbase, &[0x55; 80]);

        assert!(!evaluation.meets_pool);
        assert!(!evaluation.primary_candidate);
        assert!(evaluation.aux_candidates.is_empty());
        assert!(!evaluation.is_block_candidate());
    }

    #[test]
    fn share_meeting_only_the_pool_target_is_valid() {
        let mut workbase = workbase(1.0, 1);
        force_targets(&mut workbase, max_target(), Target::ZERO, vec![Target::ZERO]);

        let evaluation = evaluate(&workbase, &[0x55; 80]);

        assert!(evaluation.meets_pool);
        assert!(!evaluation.primary_candidate);
        assert!(evaluation.aux_candidates.is_empty());
        assert!(!evaluation.is_block_candidate());
    }

    #[test]
    fn primary_candidate_when_primary_target_met() {
        let mut workbase = workbase(1.0, 0);
        force_targets(&mut workbase, max_target(), max_target(), Vec::new());

        let evaluation = evaluate(&workbase, &[0x55; 80]);

        assert!(evaluation.meets_pool);
        assert!(evaluation.primary_candidate);
        assert!(evaluation.is_block_candidate());
    }

    #[test]
    fn aux_candidates_collect_every_met_chain() {
        let mut workbase = workbase(1.0, 3);
        force_targets(
            &mut workbase,
            max_target(),
            Target::ZERO,
            vec![max_target(), Target::ZERO, max_target()],
        );

        let evaluation = evaluate(&workbase, &[0x55; 80]);

        assert!(!evaluation.primary_candidate);
        assert_eq!(evaluation.aux_candidates, vec![0, 2]);
        assert!(evaluation.is_block_candidate());
    }

    #[test]
    fn aux_block_with_zero_hash_is_skipped() {
        let mut workbase = workbase(1.0, 1);
        workbase.aux_blocks[0].hash = Hash256::ZERO;
        force_targets(&mut workbase, max_target(), Target::ZERO, vec![max_target()]);

        let evaluation = evaluate(&workbase, &[0x55; 80]);

        assert!(evaluation.aux_candidates.is_empty());
    }

    #[test]
    fn hash_exactly_on_target_counts() {
        let workbase = workbase(1.0, 0);

        // compute the real digest, then pin the pool target exactly on it
        let header = [0x55u8; 80];
        let hash = (workbase.chain.header_digest)(&header);

        let mut pinned = workbase;
        let exact = Target::from_le_hex(&hash.to_hex()).unwrap();
        force_targets(&mut pinned, exact, Target::ZERO, Vec::new());

        let evaluation = evaluate(&pinned, &header);
        assert!(evaluation.meets_pool, "≤ semantics: equality is a share");
    }

    #[test]
    fn share_difficulty_is_pool_space() {
        // Scrypt chain, multiplier 65536: pool difficulty 65536 works out to
        // share difficulty 1.
        let workbase = workbase(65536.0, 0);
        let evaluation = evaluate(&workbase, &[0x00; 80]);
        assert!((evaluation.share_difficulty - 1.0).abs() < 1e-9);
    }

    #[test]
    fn primary_candidate_implies_recorded_share_when_network_is_harder() {
        // If the primary target is at or below the pool target, any primary
        // candidate also meets the pool target.
        let workbase = workbase(1.0, 0);
        assert!(workbase.primary_target <= workbase.pool_target);

        let header = [0x00u8; 80];
        let evaluation = evaluate(&workbase, &header);
        if evaluation.primary_candidate {
            assert!(evaluation.meets_pool);
        }
    }

    #[test]
    fn scrypt_digest_drives_the_comparison() {
        let workbase = workbase(1.0, 0);
        let header = [0x55u8; 80];

        let evaluation = evaluate(&workbase, &header);
        assert_eq!(evaluation.hash, scrypt_digest(&header));
        assert_ne!(evaluation.hash, double_sha256(&header));
    }
}
