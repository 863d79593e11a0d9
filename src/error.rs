/// Binning invariant violations. Any of these ends the run.
#[derive(Debug, thiserror::Error)]
pub enum BinningError {
    #[error("failed to remove particle {particle} from bin {bin} (row {row}, col {col}); bin holds {contents:?}")]
    ParticleNotFound {
        particle: usize,
        bin: usize,
        row: usize,
        col: usize,
        contents: Vec<usize>,
    },
    #[error("particle {particle} is filed in {found} bin(s), expected exactly one")]
    MembershipCount { particle: usize, found: usize },
    #[error("particle {particle} at ({x}, {y}) is filed in bin {filed} but lies in bin {expected}")]
    WrongBin {
        particle: usize,
        x: f64,
        y: f64,
        filed: usize,
        expected: usize,
    },
    #[error("bins hold {binned} entries for {particles} particles")]
    Conservation { binned: usize, particles: usize },
}
