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

use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use upsign_core::utils::Redact;

/// Upload parameters issued by the upstream API.
///
/// Immutable for the lifetime of one upload attempt: the coordinator reads
/// them once to resolve the target and build the signer, then only the
/// signer's captured copies are consulted.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParameters {
    /// The provider endpoint upload requests target.
    pub action: String,
    /// Access-key identifier spliced into legacy authorization headers.
    pub access_key_id: String,
    /// Content type of the object being uploaded.
    pub content_type: String,
    /// The storage policy document, as issued.
    pub policy: String,
    /// Pre-issued signature over the policy document.
    pub policy_signature: String,
    /// Canned ACL applied to the object.
    pub acl: String,
    /// Region override; resolved from the action URL when absent.
    #[serde(default)]
    pub region: Option<String>,
    /// Object key to upload to.
    pub key: String,
    /// Status code the provider answers the final phase with.
    #[serde(default = "default_success_status")]
    pub success_action_status: u16,
    /// The signing-delegation URL scoped to this upload.
    #[serde(default)]
    pub signature_url: Option<String>,
    /// Identifier of the owning video.
    pub video_id: String,
    /// Identifier of the owning asset, if the upstream API issues one.
    #[serde(default)]
    pub asset_id: Option<String>,
}

fn default_success_status() -> u16 {
    200
}

impl Debug for UploadParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadParameters")
            .field("action", &self.action)
            .field("access_key_id", &self.access_key_id)
            .field("content_type", &self.content_type)
            .field("policy", &Redact::from(&self.policy))
            .field("policy_signature", &Redact::from(&self.policy_signature))
            .field("acl", &self.acl)
            .field("region", &self.region)
            .field("key", &self.key)
            .field("success_action_status", &self.success_action_status)
            .field("signature_url", &Redact::from(&self.signature_url))
            .field("video_id", &self.video_id)
            .field("asset_id", &self.asset_id)
            .finish()
    }
}
