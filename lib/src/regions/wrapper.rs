// Copyright 2025 The Drasi Authors.
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

use std::rc::Rc;

use super::router::{RegionEventRouter, RegistrationId};
use crate::host::Emitter;
use crate::native::RegionId;

/// Host-side object for one native region.
///
/// Registered with its router for as long as it lives.
pub struct RegionWrapper {
    region: RegionId,
    emitter: Rc<dyn Emitter>,
    router: RegionEventRouter,
    registration: RegistrationId,
}

impl RegionWrapper {
    pub fn new(router: &RegionEventRouter, region: RegionId, emitter: Rc<dyn Emitter>) -> Rc<Self> {
        Rc::new_cyclic(|weak| {
            let registration = router.add(region.clone(), weak.clone());
            Self {
                region,
                emitter,
                router: router.clone(),
                registration,
            }
        })
    }

    pub fn region(&self) -> &RegionId {
        &self.region
    }

    /// The region's name without its parent path.
    pub fn name(&self) -> &str {
        let path = self.region.full_path();
        path.rsplit('/').next().unwrap_or(path)
    }

    pub fn emitter(&self) -> &Rc<dyn Emitter> {
        &self.emitter
    }
}

impl Drop for RegionWrapper {
    fn drop(&mut self) {
        self.router.remove(self.registration);
    }
}
