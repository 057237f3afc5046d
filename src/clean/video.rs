// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Video format normalization.
//!
//! Decides which preview videos referenced by a descriptor need to be
//! transcoded, and records the outcome. The codec work itself belongs to a
//! [`MediaProbe`].

use crate::{journal::Journal, media::MediaProbe, store::descriptor::Descriptor};

use tracing::{debug, instrument};

/// Bring every referenced video to the target pixel format.
///
/// In a dry run nothing is transcoded, but the change that would have been
/// made is still recorded. Probe and transcode failures are notices.
#[instrument(skip(descriptor, probe), level = "debug")]
pub fn format_videos(
    descriptor: &Descriptor,
    collection: &str,
    probe: &impl MediaProbe,
    pixel_format: &str,
    dry_run: bool,
) -> Journal {
    let mut journal = Journal::new(collection);

    for entry in &descriptor.entries {
        let Some(video) = entry.field("video").filter(|video| !video.is_empty()) else {
            continue;
        };
        let path = descriptor.resolve(video);
        let name = entry.display_name();

        let current = match probe.pixel_format(&path) {
            Ok(Some(current)) => current,
            Ok(None) => {
                journal.notice(format!("no video stream in {:?}", path.display()));
                continue;
            }
            Err(error) => {
                journal.notice(format!("failed processing {:?}: {error}", path.display()));
                continue;
            }
        };

        if current == pixel_format {
            debug!("{:?} already {pixel_format}", path.display());
            continue;
        }

        if !dry_run {
            if let Err(error) = probe.transcode(&path, pixel_format) {
                journal.notice(format!("failed converting {:?}: {error}", path.display()));
                continue;
            }
        }

        journal.change(format!("converted video of `{name}` from {current} to {pixel_format}"));
    }

    journal
}
