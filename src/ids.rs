use rand::Rng;

/// URL-safe symbols, 6 bits of entropy each.
const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_-";

pub const MIN_LEN: usize = 7;
pub const MAX_LEN: usize = 14;

/// Produces candidate identifiers. Uniqueness is not promised here,
/// callers resolve collisions through the store.
pub trait IdGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

/// Random short ids drawn from the thread-local rng.
#[derive(Debug, Clone, Copy)]
pub struct ShortId {
    len: usize,
}

impl ShortId {
    pub fn new(len: usize) -> Self {
        Self { len: len.clamp(MIN_LEN, MAX_LEN) }
    }

    pub fn length(&self) -> usize {
        self.len
    }
}

impl Default for ShortId {
    fn default() -> Self {
        Self::new(10)
    }
}

impl IdGenerator for ShortId {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.len)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
