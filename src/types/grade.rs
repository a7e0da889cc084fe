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

use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::fail;

/// The outcome of reviewing a card.
///
/// The review UI only ever produces `Easy`, `Medium` and `Hard`. `Fail` is
/// kept so that the scheduler's failure path has a grade that reaches it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Easy,
    Medium,
    Hard,
    Fail,
}

impl Grade {
    pub fn quality(self) -> Quality {
        match self {
            Grade::Easy => Quality(5),
            Grade::Medium => Quality(4),
            Grade::Hard => Quality(3),
            Grade::Fail => Quality(0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Easy => "easy",
            Grade::Medium => "medium",
            Grade::Hard => "hard",
            Grade::Fail => "fail",
        }
    }
}

impl TryFrom<&str> for Grade {
    type Error = ErrorReport;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "easy" => Ok(Grade::Easy),
            "medium" => Ok(Grade::Medium),
            "hard" => Ok(Grade::Hard),
            "fail" => Ok(Grade::Fail),
            _ => fail(format!("Invalid grade: {value}")),
        }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Grade {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Grade {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        Grade::try_from(string.as_str()).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Recall quality on the 0-5 scale. Anything below 3 is a failed review.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Quality(u8);

impl TryFrom<u8> for Quality {
    type Error = ErrorReport;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Quality::MAX {
            return fail(format!("quality must be between 0 and 5, got {value}"));
        }
        Ok(Quality(value))
    }
}

impl Quality {
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 >= 3
    }
}
