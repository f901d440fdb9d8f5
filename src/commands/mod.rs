// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod config;
pub mod budgets;
pub mod plans;
pub mod payments;
pub mod cash;
pub mod reports;
pub mod exporter;
pub mod doctor;
