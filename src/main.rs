use clap::Parser;
use modulo_word_ranker::{DEFAULT_MODULUS, ModuloCalculator, ModulusError, WordRanker};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "word-rank")]
#[command(version, about = "Rank words among the distinct permutations of their letters")]
struct Cli {
    /// Words to rank; defaults to a small demo set
    words: Vec<String>,

    /// Prime modulus the ranks are reduced by
    #[arg(long, env = "WORD_RANK_MODULUS", default_value_t = DEFAULT_MODULUS)]
    modulus: u64,

    /// How many times the concatenated demo word is repeated
    #[arg(long, default_value_t = 10)]
    repeat: usize,
}

fn main() -> Result<(), ModulusError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let mut calculator = ModuloCalculator::new(cli.modulus)?;
    info!(modulus = calculator.modulus(), "ranking words");

    let words = if cli.words.is_empty() {
        let mut words = vec!["bookkeeper".to_string(), "question".to_string()];
        let joined = words.concat();
        words.push(joined.clone());
        words.push(joined.repeat(cli.repeat));
        words
    } else {
        cli.words
    };

    let mut ranker: WordRanker = WordRanker::with_calculator(&mut calculator);
    for word in &words {
        println!("{word}:\n {}", ranker.rank_of_str(word));
    }
    drop(ranker);

    info!(
        highest_factorial = calculator.highest_factorial_computed(),
        "done"
    );
    Ok(())
}
