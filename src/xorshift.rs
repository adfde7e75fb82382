use rand::{Error, RngCore, SeedableRng};

/// Mixed into the subsystem tag to form the game seed
pub const SEED_SALT: u32 = 0xA5A5_A5A5;

/// xorshift32 (13, 17, 5). Deterministic across platforms, so identical seeds
/// replay identical games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// Zero is a fixed point of xorshift, so a zero seed is replaced by the salt
    pub fn new(seed: u32) -> Self {
        XorShift32 {
            state: if seed == 0 { SEED_SALT } else { seed },
        }
    }

    /// Seed namespaced by a cartridge's subsystem tag
    pub fn from_os_id(os_id: u32) -> Self {
        XorShift32::new(SEED_SALT ^ os_id)
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn advance(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl RngCore for XorShift32 {
    fn next_u32(&mut self) -> u32 {
        self.advance()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.advance() as u64;
        let hi = self.advance() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.advance().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift32 {
    type Seed = [u8; 4];

    fn from_seed(seed: [u8; 4]) -> Self {
        XorShift32::new(u32::from_be_bytes(seed))
    }
}
