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

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

/// Text difficulty on the CEFR scale.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    /// The 0-5 ordinal used by the proficiency arithmetic.
    pub fn ordinal(self) -> u8 {
        match self {
            CefrLevel::A1 => 0,
            CefrLevel::A2 => 1,
            CefrLevel::B1 => 2,
            CefrLevel::B2 => 3,
            CefrLevel::C1 => 4,
            CefrLevel::C2 => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl Display for CefrLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fallible;

    #[test]
    fn test_ordinals_cover_zero_to_five() {
        let levels = [
            CefrLevel::A1,
            CefrLevel::A2,
            CefrLevel::B1,
            CefrLevel::B2,
            CefrLevel::C1,
            CefrLevel::C2,
        ];
        for (n, level) in levels.into_iter().enumerate() {
            assert_eq!(usize::from(level.ordinal()), n);
        }
    }

    #[test]
    fn test_deserialize() -> Fallible<()> {
        let level: CefrLevel = serde_json::from_str("\"C1\"")?;
        assert_eq!(level, CefrLevel::C1);
        assert!(serde_json::from_str::<CefrLevel>("\"Z9\"").is_err());
        Ok(())
    }
}
