// Copyright 2025 Chris Custine
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

//! The single active map/sidebar selection.

use crate::location::LocationKey;

/// At most one selection is active. Selecting a location replaces a listing
/// selection and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    /// A multi-listing location; the sidebar is narrowed to it.
    Location(LocationKey),
    /// A single listing by MLS number; the sidebar highlights it.
    Listing(String),
}

impl Selection {
    #[must_use]
    pub fn location(&self) -> Option<&LocationKey> {
        match self {
            Self::Location(key) => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn listing(&self) -> Option<&str> {
        match self {
            Self::Listing(mls) => Some(mls),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
