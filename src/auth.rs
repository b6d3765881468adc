// Copyright 2025 The Karmada Authors.
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

//! Clients of the external identity services: Keycloak for token validation
//! and OpenFGA for admin checks.

use snafu::Snafu;

pub mod keycloak;
pub mod openfga;

pub use keycloak::Keycloak;
pub use openfga::OpenFga;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{} request failed: {}", service, source))]
    Request {
        service: &'static str,
        source: reqwest::Error,
    },
}
