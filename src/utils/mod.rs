// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Terminal utilities

pub mod spinner;

pub use spinner::*;
