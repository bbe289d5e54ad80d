use crate::DEFAULT_MODULUS;
use crate::error::ModulusError;
use std::collections::HashMap;
use tracing::trace;

/// Arithmetic under one fixed modulus, with memoized factorials and inverse factorials.
///
/// Every result is a residue in `[0, modulus)`. Products are widened to `u128`, so no input
/// magnitude can overflow. Inverses are only meaningful for values coprime to the modulus,
/// which is always the case for nonzero residues of a prime modulus.
#[derive(Clone, Debug)]
pub struct ModuloCalculator {
    modulus: u64,
    // factorials[n] == n! mod modulus, always a contiguous prefix
    factorials: Vec<u64>,
    inverse_factorials: HashMap<u64, u64>,
}

impl ModuloCalculator {
    /// Builds a calculator for a prime modulus.
    pub fn new(modulus: u64) -> Result<Self, ModulusError> {
        if modulus < 2 {
            return Err(ModulusError::TooSmall(modulus));
        }
        if !is_prime(modulus) {
            return Err(ModulusError::NotPrime(modulus));
        }
        Ok(Self::new_unchecked(modulus))
    }

    /// Builds a calculator without checking primality.
    ///
    /// With a composite modulus, `multiplicative_inverse`, `divide` and `inverse_factorial`
    /// return meaningless values whenever their argument shares a factor with the modulus.
    pub fn new_unchecked(modulus: u64) -> Self {
        assert!(modulus > 0, "modulus must be positive");
        let one = 1 % modulus;
        ModuloCalculator {
            modulus,
            factorials: vec![one, one],
            inverse_factorials: HashMap::new(),
        }
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn multiply(&self, a: u64, b: u64) -> u64 {
        let m = self.modulus as u128;
        ((a as u128 % m) * (b as u128 % m) % m) as u64
    }

    pub fn add(&self, a: u64, b: u64) -> u64 {
        let m = self.modulus as u128;
        ((a as u128 % m + b as u128 % m) % m) as u64
    }

    /// Returns `x` in `[0, m)` with `n * x == 1 (mod m)`, by the extended Euclidean algorithm.
    ///
    /// Requires `gcd(m, n) == 1`; otherwise the result is not an inverse.
    pub fn modular_inverse(m: u64, n: u64) -> u64 {
        let (mut t, mut t2) = (0i128, 1i128);
        let (mut r, mut r2) = (m as i128, n as i128);
        while r2 != 0 {
            let q = r / r2;
            (t, t2) = (t2, t - t2 * q);
            (r, r2) = (r2, r - r2 * q);
        }
        t.rem_euclid(m as i128) as u64
    }

    pub fn multiplicative_inverse(&self, n: u64) -> u64 {
        Self::modular_inverse(self.modulus, n)
    }

    pub fn divide(&self, dividend: u64, divisor: u64) -> u64 {
        self.multiply(dividend, self.multiplicative_inverse(divisor))
    }

    /// `n! mod modulus`, where `n` is first reduced modulo the modulus.
    ///
    /// Extends the cached prefix from the highest factorial computed so far, so each
    /// factorial is computed at most once over the calculator's lifetime.
    pub fn factorial(&mut self, n: u64) -> u64 {
        let n = (n % self.modulus) as usize;
        if let Some(&cached) = self.factorials.get(n) {
            return cached;
        }

        let start = self.factorials.len();
        trace!(from = start - 1, to = n, "extending factorial cache");
        let mut prod = self.factorials[start - 1];
        self.factorials.reserve(n + 1 - start);
        for i in start..=n {
            prod = self.multiply(prod, i as u64);
            self.factorials.push(prod);
        }
        prod
    }

    /// `(n!)^-1 mod modulus`, cached per distinct `n mod modulus`.
    pub fn inverse_factorial(&mut self, n: u64) -> u64 {
        let n = n % self.modulus;
        if let Some(&cached) = self.inverse_factorials.get(&n) {
            return cached;
        }

        let fact = self.factorial(n);
        let inverse = self.multiplicative_inverse(fact);
        trace!(n, inverse, "computed inverse factorial");
        self.inverse_factorials.insert(n, inverse);
        inverse
    }

    pub fn highest_factorial_computed(&self) -> u64 {
        (self.factorials.len() - 1) as u64
    }

    /// Cached factorials, indexed by `n`, from `0!` to the highest computed.
    pub fn cached_factorials(&self) -> &[u64] {
        &self.factorials
    }
}

impl Default for ModuloCalculator {
    fn default() -> Self {
        ModuloCalculator::new_unchecked(DEFAULT_MODULUS)
    }
}

fn pow_mod(base: u64, exp: u64, m: u64) -> u64 {
    let m = m as u128;
    let mut base = base as u128 % m;
    let mut exp = exp;
    let mut result = 1 % m;
    while exp > 0 {
        if exp % 2 == 1 {
            result = result * base % m;
        }
        base = base * base % m;
        exp /= 2;
    }
    result as u64
}

/// Deterministic Miller-Rabin, exact for every `u64`.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if n % p == 0 {
            return n == p;
        }
    }

    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    'witness: for a in [2u64, 325, 9375, 28178, 450775, 9780504, 1795265022] {
        let a = a % n;
        if a == 0 {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = pow_mod(x, 2, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
