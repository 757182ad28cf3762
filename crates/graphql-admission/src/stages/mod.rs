// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod admission;
pub mod observability;
pub mod timing;

pub use admission::Admission;
pub use observability::Observability;
pub use timing::Timing;
