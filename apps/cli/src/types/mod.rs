// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type definitions for CLI requests and responses.

mod request;
mod response;

pub use request::{
    DownsampleRequest, FloorRequest, InfoRequest, Request, SectionRequest, SegmentRequest,
};
pub use response::{
    DownsampleResponse, FloorResponse, InfoResponse, Output, Reply, Response, SectionResponse,
    SegmentResponse,
};
