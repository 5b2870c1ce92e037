// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use std::time::Duration;

// Headers rewritten during signing.
pub const X_AMZ_ACL: &str = "x-amz-acl";
pub const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
pub const X_AMZ_DATE: &str = "x-amz-date";

/// Region assumed when the action host carries the bare `s3` label.
pub const DEFAULT_REGION: &str = "us-east-1";

// The recognized endpoint hostname shape: exactly four dot separated labels,
// `{bucket}.{s3 | s3-region}.amazonaws.com`.
pub(crate) const ENDPOINT_HOST_LABELS: usize = 4;
pub(crate) const ENDPOINT_SERVICE_LABEL: &str = "s3";
pub(crate) const ENDPOINT_DOMAIN_LABEL: &str = "amazonaws";
pub(crate) const ENDPOINT_TLD_LABEL: &str = "com";

// Hermetic-test short-circuit: these hosts bypass hostname-shape validation
// so tests can point the whole flow at a loopback server.
pub(crate) const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1"];
pub(crate) const LOCAL_BUCKET: &str = "local-dev-bucket";

/// Content type forced on the complete/abort phase body.
pub(crate) const XML_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";

// Path template of the token-keyed signing endpoint, relative to the origin
// of the issued delegation URL.
pub(crate) const LEGACY_SIGNING_PATH: &str = "/videos/{video}/signatures";

/// How long a delegate call may block an upload worker before it fails.
pub(crate) const DEFAULT_DELEGATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Part sizing for the multipart uploader. Providers reject non-final parts
/// below [`MIN_PART_SIZE`].
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;
pub(crate) const DEFAULT_PART_SIZE: usize = 16 * 1024 * 1024;
pub(crate) const DEFAULT_PART_CONCURRENCY: usize = 4;

/// AsciiSet for encoding object keys into request paths.
///
/// Every byte is encoded except the unreserved characters and `/`.
pub(crate) static KEY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
