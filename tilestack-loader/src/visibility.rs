//! Deferred image tracking.
//!
//! This module owns every lazy placeholder on the page and moves each one
//! through `Unwatched → Watched → Loading → Loaded`. `Loaded` is terminal: a
//! loaded image is dropped from the proximity registration and can never be
//! watched again.
//!
//! # Lifecycle
//!
//! - [`VisibilityTracker::watch`] registers a placeholder that still has a
//!   pending source.
//! - When the proximity mechanism reports it near the viewport,
//!   [`VisibilityTracker::handle_entries`] assigns the real source through the
//!   [`ImageHost`] and hands back the decode future as a [`DecodeTask`].
//! - Once that future resolves, [`VisibilityTracker::finish_decode`] checks
//!   that a real image (not a 1×1 placeholder) arrived and marks it loaded.
//!
//! There is no decode timeout. An image whose decode never completes stays
//! `Loading` for the rest of the page lifetime.
//!
//! # Pausing
//!
//! [`VisibilityTracker::unwatch_all`] empties the registration while fast
//! scrolling. Images that were already `Loading` keep loading; only the
//! notification registration is dropped.

use std::future::Future;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use tilestack_ui::px::{Px, PxSize};
use tracing::{debug, trace, warn};

use crate::proximity::{ProximityEntry, ProximityRegion, ViewportProximitySource};

new_key_type! {
    /// Identity of a lazy image element. The element itself is owned by the host.
    pub struct ImageId;
}

/// Where an image is in its deferred-load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Known but not registered for proximity notifications.
    Unwatched,
    /// Registered and waiting to come near the viewport.
    Watched,
    /// Source assigned, waiting for decode.
    Loading,
    /// Decoded and marked loaded. Terminal.
    Loaded,
}

/// What the host reports once an assigned source finishes decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImage {
    /// Intrinsic size of the decoded resource.
    pub natural: PxSize,
}

impl DecodedImage {
    /// Placeholders are 1px wide; anything wider is a real image.
    pub fn is_real(&self) -> bool {
        self.natural.width > Px(1)
    }
}

/// The host side of an image element.
pub trait ImageHost {
    /// Resolves when the resource behind an assigned source has decoded.
    ///
    /// `None` means the host gave up on the resource; the image then stays
    /// `Loading`.
    type Decode: Future<Output = Option<DecodedImage>> + 'static;

    /// Assigns the real source to the element, which starts the fetch.
    fn assign_source(&self, image: ImageId, source: &str) -> Self::Decode;

    /// Applies the "loaded" marker to the element.
    fn mark_loaded(&self, image: ImageId);
}

/// A pending decode for an image that just entered `Loading`.
pub struct DecodeTask<F> {
    /// The image being loaded.
    pub image: ImageId,
    /// Completion signal from the host.
    pub decode: F,
}

#[derive(Debug)]
struct TrackedImage {
    pending_source: Option<String>,
    state: LoadState,
    registered: bool,
}

/// Owns the set of lazy images and their proximity registration.
pub struct VisibilityTracker<S> {
    images: SlotMap<ImageId, TrackedImage>,
    source: S,
    region: ProximityRegion,
}

impl<S: ViewportProximitySource> VisibilityTracker<S> {
    /// Creates an empty tracker over a proximity source.
    pub fn new(source: S, region: ProximityRegion) -> Self {
        Self {
            images: SlotMap::with_key(),
            source,
            region,
        }
    }

    /// Adds a placeholder. Images without a deferred source are known but
    /// never tracked.
    pub fn add_image(&mut self, pending_source: Option<String>) -> ImageId {
        let pending_source = pending_source.filter(|src| !src.trim().is_empty());
        self.images.insert(TrackedImage {
            pending_source,
            state: LoadState::Unwatched,
            registered: false,
        })
    }

    /// The lifecycle state of `image`.
    pub fn state(&self, image: ImageId) -> Option<LoadState> {
        self.images.get(image).map(|tracked| tracked.state)
    }

    /// Whether `image` currently holds a proximity registration.
    pub fn is_registered(&self, image: ImageId) -> bool {
        self.images.get(image).is_some_and(|tracked| tracked.registered)
    }

    /// Number of images holding a proximity registration.
    pub fn registered_count(&self) -> usize {
        self.images.values().filter(|tracked| tracked.registered).count()
    }

    /// All known images.
    pub fn images(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.images.keys()
    }

    /// Images a resume may watch: unwatched, not loaded, source still pending.
    pub fn watch_candidates(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.images.iter().filter_map(|(id, tracked)| {
            (tracked.state == LoadState::Unwatched && tracked.pending_source.is_some())
                .then_some(id)
        })
    }

    /// The proximity source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The proximity source, mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Registers `image` for proximity notifications.
    ///
    /// Returns false (and does nothing) when the image has no pending source,
    /// is already loaded or loading, or is already registered.
    pub fn watch(&mut self, image: ImageId) -> bool {
        let Some(tracked) = self.images.get_mut(image) else {
            return false;
        };
        if tracked.registered
            || tracked.pending_source.is_none()
            || tracked.state != LoadState::Unwatched
        {
            return false;
        }
        tracked.registered = true;
        tracked.state = LoadState::Watched;
        self.source.register(image, self.region);
        trace!("Watching image {image:?}");
        true
    }

    /// Drops the registration of `image`, whatever its state.
    ///
    /// A `Watched` image returns to `Unwatched`; a `Loading` image keeps
    /// loading.
    pub fn unwatch(&mut self, image: ImageId) {
        let Some(tracked) = self.images.get_mut(image) else {
            return;
        };
        if tracked.registered {
            tracked.registered = false;
            self.source.unregister(image);
        }
        if tracked.state == LoadState::Watched {
            tracked.state = LoadState::Unwatched;
        }
    }

    /// Drops every registration.
    pub fn unwatch_all(&mut self) {
        let registered: SmallVec<[ImageId; 16]> = self
            .images
            .iter()
            .filter_map(|(id, tracked)| tracked.registered.then_some(id))
            .collect();
        debug!("Unwatching {} images", registered.len());
        for image in registered {
            self.unwatch(image);
        }
    }

    /// Forces the proximity source to re-check every registered image.
    pub fn reconnect(&mut self) {
        self.source.force_reevaluate();
    }

    /// Processes a batch of proximity notifications in order.
    ///
    /// Every `Watched` image that entered the region moves to `Loading` and
    /// gets its source assigned; the returned tasks carry the decode futures.
    pub fn handle_entries<H: ImageHost>(
        &mut self,
        entries: &[ProximityEntry],
        host: &H,
    ) -> SmallVec<[DecodeTask<H::Decode>; 4]> {
        let mut tasks = SmallVec::new();
        for entry in entries.iter().filter(|entry| entry.is_intersecting) {
            let Some(tracked) = self.images.get_mut(entry.image) else {
                continue;
            };
            if tracked.state != LoadState::Watched {
                trace!("Ignoring entry for image {:?} in {:?}", entry.image, tracked.state);
                continue;
            }
            let Some(source) = tracked.pending_source.take() else {
                continue;
            };
            tracked.state = LoadState::Loading;
            debug!("Image {:?} near viewport; assigning {source}", entry.image);
            tasks.push(DecodeTask {
                image: entry.image,
                decode: host.assign_source(entry.image, &source),
            });
        }
        tasks
    }

    /// Completes a decode started by [`handle_entries`](Self::handle_entries).
    ///
    /// Returns true when the image became `Loaded`.
    pub fn finish_decode<H: ImageHost>(
        &mut self,
        image: ImageId,
        outcome: Option<DecodedImage>,
        host: &H,
    ) -> bool {
        let Some(tracked) = self.images.get_mut(image) else {
            return false;
        };
        if tracked.state != LoadState::Loading {
            return false;
        }
        match outcome {
            Some(decoded) if decoded.is_real() => {
                tracked.state = LoadState::Loaded;
                if tracked.registered {
                    tracked.registered = false;
                    self.source.unregister(image);
                }
                host.mark_loaded(image);
                debug!("Image {image:?} loaded at {:?}", decoded.natural);
                true
            }
            Some(decoded) => {
                warn!(
                    "Image {image:?} decoded as a placeholder ({:?}); still loading",
                    decoded.natural
                );
                false
            }
            None => {
                warn!("Image {image:?} never finished decoding; still loading");
                false
            }
        }
    }

    /// Releases every registration; used on teardown.
    pub fn release_all(&mut self) {
        self.unwatch_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{FakeHost, FakeProximity, decoded};

    fn tracker() -> VisibilityTracker<FakeProximity> {
        VisibilityTracker::new(FakeProximity::default(), ProximityRegion::default())
    }

    #[test]
    fn watch_requires_pending_source() {
        let mut tracker = tracker();
        let without = tracker.add_image(None);
        let blank = tracker.add_image(Some("  ".to_string()));
        let with = tracker.add_image(Some("a.png".to_string()));

        assert!(!tracker.watch(without));
        assert!(!tracker.watch(blank));
        assert!(tracker.watch(with));
        assert!(!tracker.watch(with));

        assert_eq!(tracker.state(with), Some(LoadState::Watched));
        assert_eq!(tracker.state(without), Some(LoadState::Unwatched));
        assert_eq!(tracker.source().registered_ids(), vec![with]);
    }

    #[test]
    fn entry_assigns_source_once() {
        let mut tracker = tracker();
        let host = FakeHost::default();
        let image = tracker.add_image(Some("a.png".to_string()));
        tracker.watch(image);

        let tasks = tracker.handle_entries(&[ProximityEntry::entered(image)], &host);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tracker.state(image), Some(LoadState::Loading));
        assert_eq!(host.assigned(), vec![(image, "a.png".to_string())]);

        let again = tracker.handle_entries(&[ProximityEntry::entered(image)], &host);
        assert!(again.is_empty());
        assert_eq!(host.assigned().len(), 1);
    }

    #[test]
    fn exit_entries_and_unwatched_images_are_ignored() {
        let mut tracker = tracker();
        let host = FakeHost::default();
        let watched = tracker.add_image(Some("a.png".to_string()));
        let idle = tracker.add_image(Some("b.png".to_string()));
        tracker.watch(watched);

        let tasks = tracker.handle_entries(
            &[ProximityEntry::left(watched), ProximityEntry::entered(idle)],
            &host,
        );
        assert!(tasks.is_empty());
        assert_eq!(tracker.state(watched), Some(LoadState::Watched));
        assert_eq!(tracker.state(idle), Some(LoadState::Unwatched));
    }

    #[test]
    fn decode_completion_is_sticky() {
        let mut tracker = tracker();
        let host = FakeHost::default();
        let image = tracker.add_image(Some("a.png".to_string()));
        tracker.watch(image);
        tracker.handle_entries(&[ProximityEntry::entered(image)], &host);

        assert!(tracker.finish_decode(image, Some(decoded(640, 480)), &host));
        assert_eq!(tracker.state(image), Some(LoadState::Loaded));
        assert!(!tracker.is_registered(image));
        assert_eq!(host.loaded(), vec![image]);

        assert!(!tracker.watch(image));
        assert!(!tracker.finish_decode(image, Some(decoded(640, 480)), &host));
        assert_eq!(host.loaded().len(), 1);
    }

    #[test]
    fn placeholder_decode_keeps_loading() {
        let mut tracker = tracker();
        let host = FakeHost::default();
        let image = tracker.add_image(Some("a.png".to_string()));
        tracker.watch(image);
        tracker.handle_entries(&[ProximityEntry::entered(image)], &host);

        assert!(!tracker.finish_decode(image, Some(decoded(1, 1)), &host));
        assert!(!tracker.finish_decode(image, None, &host));
        assert_eq!(tracker.state(image), Some(LoadState::Loading));
        assert!(host.loaded().is_empty());
    }

    #[test]
    fn unwatch_all_empties_registration_but_keeps_loading() {
        let mut tracker = tracker();
        let host = FakeHost::default();
        let loading = tracker.add_image(Some("a.png".to_string()));
        let watched = tracker.add_image(Some("b.png".to_string()));
        tracker.watch(loading);
        tracker.watch(watched);
        tracker.handle_entries(&[ProximityEntry::entered(loading)], &host);

        tracker.unwatch_all();
        assert_eq!(tracker.registered_count(), 0);
        assert!(tracker.source().registered_ids().is_empty());
        assert_eq!(tracker.state(loading), Some(LoadState::Loading));
        assert_eq!(tracker.state(watched), Some(LoadState::Unwatched));

        // Loading images are not candidates: their source is already assigned.
        let candidates: Vec<_> = tracker.watch_candidates().collect();
        assert_eq!(candidates, vec![watched]);

        // A paused image can still finish loading.
        assert!(tracker.finish_decode(loading, Some(decoded(10, 10)), &host));
    }

    #[test]
    fn reconnect_forces_reevaluation() {
        let mut tracker = tracker();
        tracker.reconnect();
        assert_eq!(tracker.source().reevaluations(), 1);
    }
}
