// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Player state: live parameters and the open session.

pub mod params;
pub mod session;
