// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=REX_SDK_LIB_DIR");
    println!("cargo:rerun-if-env-changed=REX_SDK_LIB_NAME");

    // The SDK glue library is only linked when the vendor decoder is enabled.
    if env::var_os("CARGO_FEATURE_REX_SDK").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("REX_SDK_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
    let name = env::var("REX_SDK_LIB_NAME").unwrap_or_else(|_| "REX".to_string());
    println!("cargo:rustc-link-lib=static={}", name);

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos") {
        println!("cargo:rustc-link-lib=framework=CoreFoundation");
    }
}
