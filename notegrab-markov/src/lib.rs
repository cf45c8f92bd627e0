//! Bigram Markov model over collected notes.
//!
//! Training reads the notes file written by `notegrab collect`, lexes each
//! note's text as MFM (Misskey Flavored Markup) so that `:emoji:` codes and
//! `$[fn ...]` blocks survive as units, splits plain text into morphemes
//! with the IPADIC dictionary, and counts token-to-token transitions. Simulation walks those counts from the
//! start token to produce a new note.
//!
//! ```
//! use notegrab_markov::{Simulator, Trainer};
//! use rand::SeedableRng;
//!
//! let mut trainer = Trainer::new().unwrap();
//! trainer.feed("hello world").unwrap();
//! let sim = Simulator::new(trainer.finish());
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! assert_eq!(sim.generate(10, &mut rng), "hello world");
//! ```
pub mod mfm;
pub mod model;
pub mod segment;
pub mod simulate;
pub mod train;

pub use model::{FunctionParamValue, MarkovData, MarkovToken};
pub use segment::{LinderaSegmenter, ScriptSegmenter, Segmenter};
pub use simulate::Simulator;
pub use train::{Trainer, load_note_texts};
