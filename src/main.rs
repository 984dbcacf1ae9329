// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Meshwarp demo: warp an image file through a scripted editing session

fn main() -> anyhow::Result<()> {
    meshwarp::run()
}
