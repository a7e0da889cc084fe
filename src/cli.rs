// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;

use crate::cmd::OutputFormat;
use crate::cmd::add::add_card;
use crate::cmd::delta::print_sample_delta;
use crate::cmd::due::print_due_cards;
use crate::cmd::ingest::print_ingest;
use crate::cmd::review::review_card;
use crate::cmd::stats::print_stats;
use crate::error::Fallible;
use crate::types::grade::Grade;
use crate::types::timestamp::Timestamp;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Save a word or phrase as a new card.
    Add {
        /// The word or phrase in the language being learned.
        text: String,
        /// Its meaning in your own language.
        translation: String,
        /// Path to the collection directory. By default, the current working directory is used.
        #[arg(long)]
        directory: Option<String>,
    },
    /// Record how a review went.
    Review {
        /// The card's hash, or an unambiguous prefix of it.
        hash: String,
        grade: ReviewGrade,
        /// Path to the collection directory. By default, the current working directory is used.
        #[arg(long)]
        directory: Option<String>,
    },
    /// List the cards due for review, most overdue first.
    Due {
        /// Path to the collection directory. By default, the current working directory is used.
        #[arg(long)]
        directory: Option<String>,
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Compute the proficiency delta of a comprehension sample (JSON).
    Delta {
        /// Path to the sample file.
        sample: PathBuf,
    },
    /// Replay a telemetry log (JSON Lines) and update proficiency scores.
    Ingest {
        /// Path to the log file.
        log: PathBuf,
        /// Path to the collection directory. By default, the current working directory is used.
        #[arg(long)]
        directory: Option<String>,
    },
    /// Print collection statistics.
    Stats {
        /// Path to the collection directory. By default, the current working directory is used.
        #[arg(long)]
        directory: Option<String>,
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// The grades a learner can give. Failing a card is not offered.
#[derive(ValueEnum, Clone, Copy)]
enum ReviewGrade {
    Easy,
    Medium,
    Hard,
}

impl From<ReviewGrade> for Grade {
    fn from(value: ReviewGrade) -> Self {
        match value {
            ReviewGrade::Easy => Grade::Easy,
            ReviewGrade::Medium => Grade::Medium,
            ReviewGrade::Hard => Grade::Hard,
        }
    }
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Add {
            text,
            translation,
            directory,
        } => {
            let hash = add_card(directory, &text, &translation, Timestamp::now())?;
            println!("{hash}");
            Ok(())
        }
        Command::Review {
            hash,
            grade,
            directory,
        } => {
            let hash = review_card(directory, &hash, grade.into(), Timestamp::now())?;
            log::info!("Reviewed {hash}.");
            Ok(())
        }
        Command::Due { directory, format } => print_due_cards(directory, format),
        Command::Delta { sample } => print_sample_delta(&sample),
        Command::Ingest { log, directory } => print_ingest(directory, &log),
        Command::Stats { directory, format } => print_stats(directory, format),
    }
}
