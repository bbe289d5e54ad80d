use crate::DEFAULT_MODULUS;
use crate::error::ModulusError;
use crate::modulo_calculator::ModuloCalculator;
use either::{Either, for_both};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, warn};

/// Computes the rank of a word among the distinct permutations of its own symbols,
/// listed in lexicographic order, modulo the calculator's modulus.
///
/// Ranks are 1-based: the smallest arrangement of a multiset has rank 1. The ranker
/// either owns its `ModuloCalculator` or borrows one, so several rankers can reuse the
/// same factorial caches one after another.
pub struct WordRanker<'a, S = char> {
    calculator: Either<ModuloCalculator, &'a mut ModuloCalculator>,
    word: Vec<S>,
    symbol_counts: HashMap<S, u64>,
    unique_symbols: Vec<S>,
    rank: u64,
}

impl<S: Ord + Hash + Clone> WordRanker<'static, S> {
    pub fn new(modulus: u64) -> Result<Self, ModulusError> {
        Ok(Self::from_calculator(ModuloCalculator::new(modulus)?))
    }

    pub fn from_calculator(calculator: ModuloCalculator) -> Self {
        Self::build(Either::Left(calculator))
    }
}

impl<S: Ord + Hash + Clone> Default for WordRanker<'static, S> {
    fn default() -> Self {
        Self::from_calculator(ModuloCalculator::default())
    }
}

impl<'a, S: Ord + Hash + Clone> WordRanker<'a, S> {
    pub fn with_calculator(calculator: &'a mut ModuloCalculator) -> Self {
        Self::build(Either::Right(calculator))
    }

    fn build(calculator: Either<ModuloCalculator, &'a mut ModuloCalculator>) -> Self {
        let rank = 1 % for_both!(&calculator, c => c.modulus());
        WordRanker {
            calculator,
            word: Vec::new(),
            symbol_counts: HashMap::new(),
            unique_symbols: Vec::new(),
            rank,
        }
    }

    /// Ranks `word` immediately, so `rank()` and `word()` describe it.
    pub fn with_word<W: IntoIterator<Item = S>>(mut self, word: W) -> Self {
        self.rank_of(word);
        self
    }

    pub fn modulus(&self) -> u64 {
        for_both!(&self.calculator, c => c.modulus())
    }

    /// The word most recently ranked.
    pub fn word(&self) -> &[S] {
        &self.word
    }

    /// The rank of the word most recently ranked.
    pub fn rank(&self) -> u64 {
        self.rank
    }

    fn set_word<W: IntoIterator<Item = S>>(&mut self, word: W) {
        self.word = word.into_iter().collect();
        self.symbol_counts.clear();
        for symbol in &self.word {
            *self.symbol_counts.entry(symbol.clone()).or_insert(0) += 1;
        }
        self.unique_symbols = self.symbol_counts.keys().cloned().collect();
        self.unique_symbols.sort();
        self.rank = 1 % self.modulus();
    }

    /// Returns the 1-based rank of `word` among the distinct permutations of its symbols,
    /// reduced modulo the calculator's modulus.
    pub fn rank_of<W: IntoIterator<Item = S>>(&mut self, word: W) -> u64 {
        self.set_word(word);
        let len = self.word.len();
        if len <= 1 {
            return self.rank;
        }
        if len as u64 >= self.modulus() {
            warn!(
                len,
                modulus = self.modulus(),
                "word length reaches the modulus, rank is not meaningful"
            );
        }

        let WordRanker {
            calculator,
            word,
            symbol_counts,
            unique_symbols,
            rank,
        } = self;
        let calculator = engine(calculator);
        let unique_symbols: &[S] = unique_symbols;

        // symbol_counts holds the multiset of word[i..] when position i is considered
        for (i, placed) in word.iter().enumerate() {
            let remaining = (len - i - 1) as u64;
            for candidate in unique_symbols.iter() {
                if candidate == placed {
                    break;
                }
                if symbol_counts[candidate] == 0 {
                    continue;
                }
                decrement(symbol_counts, candidate);
                let perms =
                    count_arrangements(calculator, unique_symbols, symbol_counts, remaining);
                *rank = calculator.add(*rank, perms);
                increment(symbol_counts, candidate);
            }
            decrement(symbol_counts, placed);
        }

        for symbol in word.iter() {
            increment(symbol_counts, symbol);
        }

        debug!(len, rank = *rank, "ranked word");
        *rank
    }

    /// Ranks every word independently, sharing only the calculator's caches.
    /// Duplicate words collapse to a single entry.
    pub fn ranks_of<I, W>(&mut self, words: I) -> HashMap<Vec<S>, u64>
    where
        I: IntoIterator<Item = W>,
        W: IntoIterator<Item = S>,
    {
        let mut ranks = HashMap::new();
        for word in words {
            let rank = self.rank_of(word);
            ranks.insert(self.word.clone(), rank);
        }
        ranks
    }
}

impl<'a> WordRanker<'a, char> {
    pub fn rank_of_str(&mut self, word: &str) -> u64 {
        self.rank_of(word.chars())
    }

    pub fn ranks_of_strs<'w, I>(&mut self, words: I) -> HashMap<String, u64>
    where
        I: IntoIterator<Item = &'w str>,
    {
        words
            .into_iter()
            .map(|word| (word.to_string(), self.rank_of_str(word)))
            .collect()
    }
}

fn engine<'e, 'a>(
    calculator: &'e mut Either<ModuloCalculator, &'a mut ModuloCalculator>,
) -> &'e mut ModuloCalculator {
    match calculator {
        Either::Left(owned) => owned,
        Either::Right(borrowed) => &mut **borrowed,
    }
}

/// Number of distinct arrangements of `remaining` symbols with the given multiplicities,
/// `remaining! / prod(count!)`, modulo the calculator's modulus.
fn count_arrangements<S: Hash + Eq>(
    calculator: &mut ModuloCalculator,
    unique_symbols: &[S],
    symbol_counts: &HashMap<S, u64>,
    remaining: u64,
) -> u64 {
    let mut perms = calculator.factorial(remaining);
    for symbol in unique_symbols {
        let count = symbol_counts[symbol];
        // 0! == 1! == 1
        if count > 1 {
            let inverse = calculator.inverse_factorial(count);
            perms = calculator.multiply(perms, inverse);
        }
    }
    perms
}

fn decrement<S: Hash + Eq>(symbol_counts: &mut HashMap<S, u64>, symbol: &S) {
    if let Some(count) = symbol_counts.get_mut(symbol) {
        *count -= 1;
    }
}

fn increment<S: Hash + Eq>(symbol_counts: &mut HashMap<S, u64>, symbol: &S) {
    if let Some(count) = symbol_counts.get_mut(symbol) {
        *count += 1;
    }
}

/// Rank of `word` modulo `DEFAULT_MODULUS`.
pub fn rank(word: &str) -> u64 {
    WordRanker::<char>::default().rank_of_str(word)
}

/// Ranks of `words` modulo `DEFAULT_MODULUS`, computed with one shared calculator.
pub fn ranks<'w, I>(words: I) -> HashMap<String, u64>
where
    I: IntoIterator<Item = &'w str>,
{
    let mut calculator = ModuloCalculator::new_unchecked(DEFAULT_MODULUS);
    words
        .into_iter()
        .map(|word| {
            let rank = WordRanker::<char>::with_calculator(&mut calculator).rank_of_str(word);
            (word.to_string(), rank)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn distinct_permutations(symbols: &[char]) -> BTreeSet<Vec<char>> {
        if symbols.len() <= 1 {
            return BTreeSet::from([symbols.to_vec()]);
        }
        let mut perms = BTreeSet::new();
        for i in 0..symbols.len() {
            let mut rest = symbols.to_vec();
            let first = rest.remove(i);
            for mut tail in distinct_permutations(&rest) {
                tail.insert(0, first);
                perms.insert(tail);
            }
        }
        perms
    }

    fn brute_force_rank(word: &str) -> u64 {
        let symbols: Vec<char> = word.chars().collect();
        let position = distinct_permutations(&symbols)
            .iter()
            .position(|perm| *perm == symbols)
            .unwrap();
        position as u64 + 1
    }

    #[test]
    fn test_short_words() {
        let mut ranker: WordRanker = WordRanker::default();
        assert_eq!(ranker.rank_of_str(""), 1);
        assert_eq!(ranker.rank_of_str("a"), 1);
        assert_eq!(ranker.rank_of_str("ab"), 1);
        assert_eq!(ranker.rank_of_str("ba"), 2);
        assert_eq!(ranker.rank_of_str("aab"), 1);
        assert_eq!(ranker.rank_of_str("aba"), 2);
        assert_eq!(ranker.rank_of_str("baa"), 3);
        assert_eq!(ranker.rank_of_str("cba"), 6);
    }

    #[test]
    fn test_known_ranks() {
        let mut ranker: WordRanker = WordRanker::default();
        assert_eq!(ranker.rank_of_str("bookkeeper"), 10743);
        assert_eq!(ranker.rank_of_str("question"), 24572);
        assert_eq!(ranker.rank_of_str("bookkeeperquestion"), 549_133_272);
        assert_eq!(ranker.rank_of_str("mississippi"), 13737);
        assert_eq!(rank("bookkeeper"), 10743);
    }

    #[test]
    fn test_rank_is_independent_of_prior_state() {
        let mut calculator = ModuloCalculator::default();
        let first = WordRanker::<char>::with_calculator(&mut calculator).rank_of_str("bookkeeper");

        let mut ranker: WordRanker = WordRanker::with_calculator(&mut calculator);
        ranker.rank_of_str("question");
        ranker.rank_of_str("zyxwvutsrqponmlkjihgfedcba");
        assert_eq!(ranker.rank_of_str("bookkeeper"), first);
        assert_eq!(ranker.rank_of_str("bookkeeper"), first);
        assert_eq!(rank("bookkeeper"), first);
    }

    #[test]
    fn test_counts_restored_after_ranking() {
        let mut ranker: WordRanker = WordRanker::default();
        ranker.rank_of_str("bookkeeper");
        assert_eq!(ranker.symbol_counts[&'e'], 3);
        assert_eq!(ranker.symbol_counts[&'o'], 2);
        assert_eq!(ranker.symbol_counts[&'b'], 1);
        assert_eq!(ranker.unique_symbols, vec!['b', 'e', 'k', 'o', 'p', 'r']);
    }

    #[test]
    fn test_with_word() {
        let ranker: WordRanker = WordRanker::default().with_word("baa".chars());
        assert_eq!(ranker.word(), &['b', 'a', 'a']);
        assert_eq!(ranker.rank(), 3);
        assert_eq!(ranker.modulus(), DEFAULT_MODULUS);
    }

    #[test]
    fn test_small_modulus_wraps() {
        let mut ranker = WordRanker::<char>::new(5).unwrap();
        // "cba" is the 6th of 6 permutations
        assert_eq!(ranker.rank_of_str("cba"), 1);
        assert_eq!(ranker.rank_of_str("bca"), 4);
        assert!(WordRanker::<char>::new(6).is_err());
    }

    #[test]
    fn test_generic_symbols() {
        let mut ranker: WordRanker<u32> = WordRanker::default();
        assert_eq!(ranker.rank_of([3, 2, 1]), 6);
        assert_eq!(ranker.rank_of(vec![1, 2, 1]), 2);
    }

    #[test]
    fn test_ranks_of() {
        let mut ranker: WordRanker = WordRanker::default();
        let by_str = ranker.ranks_of_strs(["aab", "aba", "baa", "aba"]);
        assert_eq!(by_str.len(), 3);
        assert_eq!(by_str["aab"], 1);
        assert_eq!(by_str["aba"], 2);
        assert_eq!(by_str["baa"], 3);

        let by_symbols = ranker.ranks_of(["ba".chars(), "ab".chars()]);
        assert_eq!(by_symbols[&vec!['b', 'a']], 2);
        assert_eq!(by_symbols[&vec!['a', 'b']], 1);

        let shared = ranks(["bookkeeper", "question"]);
        assert_eq!(shared["bookkeeper"], 10743);
        assert_eq!(shared["question"], 24572);
    }

    proptest! {
        #[test]
        fn matches_brute_force(word in "[a-h]{0,7}") {
            let mut ranker: WordRanker = WordRanker::default();
            prop_assert_eq!(ranker.rank_of_str(&word), brute_force_rank(&word));
        }

        #[test]
        fn sorted_word_ranks_first(word in "[a-z]{0,40}") {
            let mut symbols: Vec<char> = word.chars().collect();
            symbols.sort();
            let mut ranker: WordRanker = WordRanker::default();
            prop_assert_eq!(ranker.rank_of(symbols), 1);
        }

        #[test]
        fn reverse_sorted_word_ranks_last(word in "[a-d]{1,12}") {
            let mut symbols: Vec<char> = word.chars().collect();
            symbols.sort_by(|a, b| b.cmp(a));
            let mut calculator = ModuloCalculator::default();
            let mut expected = calculator.factorial(symbols.len() as u64);
            for c in ['a', 'b', 'c', 'd'] {
                let count = symbols.iter().filter(|&&s| s == c).count() as u64;
                let inverse = calculator.inverse_factorial(count);
                expected = calculator.multiply(expected, inverse);
            }
            let mut ranker = WordRanker::with_calculator(&mut calculator);
            prop_assert_eq!(ranker.rank_of(symbols), expected);
        }
    }
}
