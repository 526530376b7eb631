//! Background music playback with fade transitions

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    time::sleep,
};
use tracing::{debug, info, warn};

use super::{
    fade::{fade_level, step_interval, FadeSettings},
    output::{AudioElement, AudioOutput, PlaybackError},
    tracks::{find_track, SoundId},
};

/// How long a sound preview plays before the previous track comes back
pub const PREVIEW_DURATION: Duration = Duration::from_secs(3);

/// Snapshot of the manager for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStatus {
    pub current_track: Option<SoundId>,
    pub is_playing: bool,
    pub volume: f32,
    pub unlocked: bool,
}

#[derive(Debug, Clone, Copy)]
enum FadeDirection {
    In,
    Out,
}

#[derive(Default)]
struct ManagerInner {
    elements: HashMap<SoundId, Box<dyn AudioElement>>,
    current: Option<SoundId>,
    is_playing: bool,
    /// The current track was paused and should resume where it stopped
    paused_mid_play: bool,
}

/// Plays at most one looping track at a time.
///
/// Every transition holds the manager lock for the full length of its fade,
/// so a new track only starts once the old one has faded out and paused.
pub struct AudioManager {
    output: Arc<dyn AudioOutput>,
    fades: FadeSettings,
    inner: Mutex<ManagerInner>,
    /// Target volume fraction as `f32` bits
    target_volume: AtomicU32,
    fade_epoch: AtomicU64,
    /// Bumped by every transport change and claim; a preview only restores
    /// the previous track if nothing happened since it started
    generation: AtomicU64,
    destroyed: AtomicBool,
    unlocked: AtomicBool,
    status_tx: watch::Sender<AudioStatus>,
}

impl AudioManager {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self::with_fades(output, FadeSettings::default())
    }

    pub fn with_fades(output: Arc<dyn AudioOutput>, fades: FadeSettings) -> Self {
        let volume = 0.6_f32;
        let (status_tx, _) = watch::channel(AudioStatus {
            current_track: None,
            is_playing: false,
            volume,
            unlocked: false,
        });
        Self {
            output,
            fades,
            inner: Mutex::new(ManagerInner::default()),
            target_volume: AtomicU32::new(volume.to_bits()),
            fade_epoch: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
            unlocked: AtomicBool::new(false),
            status_tx,
        }
    }

    fn target(&self) -> f32 {
        f32::from_bits(self.target_volume.load(Ordering::SeqCst))
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, current_track: Option<SoundId>, is_playing: bool) {
        let status = AudioStatus {
            current_track,
            is_playing,
            volume: self.target(),
            unlocked: self.unlocked.load(Ordering::SeqCst),
        };
        self.status_tx.send_replace(status);
    }

    pub fn status(&self) -> AudioStatus {
        self.status_tx.borrow().clone()
    }

    pub fn current_track(&self) -> Option<SoundId> {
        self.status_tx.borrow().current_track
    }

    pub fn is_playing(&self) -> bool {
        self.status_tx.borrow().is_playing
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Step the element's volume towards the target (fade in) or zero (fade
    /// out). Returns false if the fade was cancelled by `destroy`.
    async fn fade(&self, element: &mut dyn AudioElement, direction: FadeDirection) -> bool {
        let epoch = self.fade_epoch.load(Ordering::SeqCst);
        let (duration, steps) = match direction {
            FadeDirection::In => (self.fades.fade_in, self.fades.fade_in_steps),
            FadeDirection::Out => (self.fades.fade_out, self.fades.fade_out_steps),
        };
        let end = || match direction {
            FadeDirection::In => self.target(),
            FadeDirection::Out => 0.0,
        };

        let start = element.volume();
        if let FadeDirection::Out = direction {
            if start <= 0.0 {
                element.set_volume(0.0);
                return true;
            }
        }

        let interval = step_interval(duration, steps);
        for step in 1..=steps {
            if !interval.is_zero() {
                sleep(interval).await;
            }
            if self.fade_epoch.load(Ordering::SeqCst) != epoch {
                debug!("Fade {:?} cancelled at step {}/{}", direction, step, steps);
                return false;
            }
            element.set_volume(fade_level(start, end(), step, steps));
        }
        if steps == 0 {
            element.set_volume(end());
        }
        true
    }

    async fn stop_locked(&self, inner: &mut ManagerInner) {
        let Some(current) = inner.current else {
            return;
        };
        if let Some(element) = inner.elements.get_mut(&current) {
            self.fade(element.as_mut(), FadeDirection::Out).await;
            element.pause();
            element.seek_to_start();
        }
        inner.is_playing = false;
        inner.paused_mid_play = false;
        inner.current = None;
        debug!("Stopped track {}", current);
    }

    /// Start looping `id`, fading in from silence.
    ///
    /// Returns false when playback could not start; an autoplay block is
    /// logged separately so callers can prompt for a gesture.
    pub async fn play_track(&self, id: SoundId) -> bool {
        if id == SoundId::None {
            self.stop().await;
            return true;
        }
        if self.is_destroyed() {
            return false;
        }

        let Some(track) = find_track(id) else {
            warn!("{}", PlaybackError::TrackNotFound(id));
            return false;
        };

        let mut inner = self.inner.lock().await;
        if self.is_destroyed() {
            return false;
        }
        self.bump_generation();

        if inner.current.is_some_and(|current| current != id) {
            self.stop_locked(&mut inner).await;
        }

        if !inner.elements.contains_key(&id) {
            match self.output.create(track) {
                Ok(element) => {
                    inner.elements.insert(id, element);
                }
                Err(e) => {
                    warn!("Failed to load audio track {}: {}", track.name, e);
                    self.publish(inner.current, inner.is_playing);
                    return false;
                }
            }
        }

        let resuming = inner.current == Some(id) && inner.paused_mid_play;
        inner.current = Some(id);

        let ManagerInner {
            elements,
            is_playing,
            paused_mid_play,
            ..
        } = &mut *inner;
        let Some(element) = elements.get_mut(&id) else {
            return false;
        };

        if element.is_paused() && !resuming {
            element.seek_to_start();
            element.set_volume(0.0);
        }

        if let Err(e) = element.play() {
            match e {
                PlaybackError::AutoplayBlocked => {
                    warn!("Audio playback blocked by autoplay policy, waiting for user interaction")
                }
                other => warn!("Failed to play audio: {}", other),
            }
            *is_playing = false;
            self.publish(Some(id), false);
            return false;
        }

        *is_playing = true;
        *paused_mid_play = false;
        self.publish(Some(id), true);
        info!("Playing {}", track.name);
        self.fade(element.as_mut(), FadeDirection::In).await;
        true
    }

    /// Fade out and pause, keeping the playback position
    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        self.bump_generation();
        let Some(current) = inner.current else {
            return;
        };
        if !inner.is_playing {
            return;
        }
        if let Some(element) = inner.elements.get_mut(&current) {
            self.fade(element.as_mut(), FadeDirection::Out).await;
            element.pause();
        }
        inner.is_playing = false;
        inner.paused_mid_play = true;
        self.publish(inner.current, inner.is_playing);
        debug!("Paused track {}", current);
    }

    /// Resume the paused track. Returns false if nothing was paused or
    /// playback was refused
    pub async fn resume(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if self.is_destroyed() || inner.is_playing {
            return false;
        }
        let Some(current) = inner.current else {
            return false;
        };
        let Some(element) = inner.elements.get_mut(&current) else {
            return false;
        };
        self.bump_generation();

        if let Err(e) = element.play() {
            warn!("Failed to resume audio: {}", e);
            return false;
        }
        self.fade(element.as_mut(), FadeDirection::In).await;
        inner.is_playing = true;
        inner.paused_mid_play = false;
        self.publish(inner.current, inner.is_playing);
        true
    }

    /// Fade out, pause, rewind and forget the current track
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        self.bump_generation();
        self.stop_locked(&mut inner).await;
        self.publish(inner.current, inner.is_playing);
    }

    /// Set the volume in percent; values are clamped to 0..=100
    pub fn set_volume(&self, volume: i64) {
        let fraction = (volume as f32 / 100.0).clamp(0.0, 1.0);
        self.target_volume.store(fraction.to_bits(), Ordering::SeqCst);

        // A fade in progress holds the lock; fade-in reads the new target on
        // its next step and fade-out must keep heading to zero.
        if let Ok(mut inner) = self.inner.try_lock() {
            if inner.is_playing {
                if let Some(current) = inner.current {
                    if let Some(element) = inner.elements.get_mut(&current) {
                        element.set_volume(fraction);
                    }
                }
            }
            self.publish(inner.current, inner.is_playing);
        } else {
            self.status_tx.send_modify(|status| status.volume = fraction);
        }
    }

    /// Unlock playback after the first user gesture; later calls do nothing
    pub fn unlock(&self) {
        if !self.unlocked.swap(true, Ordering::SeqCst) {
            self.output.unlock();
            self.status_tx.send_modify(|status| status.unlocked = true);
        }
    }

    pub fn play_completion_chime(&self) {
        if !self.is_destroyed() {
            self.output.chime();
        }
    }

    /// Take over a track that is already playing, e.g. one started by a
    /// preview. Returns false if `id` is not the playing track
    pub fn claim(&self, id: SoundId) -> bool {
        if self.current_track() != Some(id) || !self.is_playing() {
            return false;
        }
        self.bump_generation();
        debug!("Claimed playing track {}", id);
        true
    }

    /// Play `id` for `duration`, then restore whatever was playing before.
    ///
    /// The restore is skipped when any other transport change or a
    /// [`claim`](Self::claim) happened in the meantime.
    pub async fn preview(self: &Arc<Self>, id: SoundId, duration: Duration) -> bool {
        if id == SoundId::None {
            return false;
        }
        let previous = self.current_track();
        let was_playing = self.is_playing();
        if was_playing && previous == Some(id) {
            // Already audible, nothing to restore afterwards
            return true;
        }

        if !self.play_track(id).await {
            return false;
        }
        let started = self.generation.load(Ordering::SeqCst);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            sleep(duration).await;
            if manager.generation.load(Ordering::SeqCst) != started {
                debug!("Preview of {} was superseded, leaving playback alone", id);
                return;
            }
            manager.stop().await;
            if let Some(previous) = previous.filter(|_| was_playing) {
                manager.play_track(previous).await;
            }
        });
        true
    }

    /// Cancel any fade, stop all tracks and release them. Safe to repeat
    pub async fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.fade_epoch.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.inner.lock().await;
        for element in inner.elements.values_mut() {
            element.set_volume(0.0);
            element.pause();
            element.seek_to_start();
        }
        let released = inner.elements.len();
        inner.elements.clear();
        inner.current = None;
        inner.is_playing = false;
        inner.paused_mid_play = false;
        self.publish(inner.current, inner.is_playing);
        if released > 0 {
            info!("Audio manager destroyed, released {} tracks", released);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VirtualMixer;

    fn manager(mixer: &VirtualMixer) -> Arc<AudioManager> {
        Arc::new(AudioManager::new(Arc::new(mixer.clone())))
    }

    fn element(mixer: &VirtualMixer, id: SoundId) -> crate::audio::ElementSnapshot {
        mixer
            .snapshot()
            .into_iter()
            .find(|e| e.id == id)
            .expect("element loaded")
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_fades_in_to_exact_volume() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.set_volume(60);

        assert!(audio.play_track(SoundId::Rain).await);
        let rain = element(&mixer, SoundId::Rain);
        assert_eq!(rain.volume, 0.6);
        assert!(!rain.paused);
        assert_eq!(audio.current_track(), Some(SoundId::Rain));
        assert!(audio.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_tracks_never_overlaps() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);

        assert!(audio.play_track(SoundId::Rain).await);
        assert!(audio.play_track(SoundId::Ocean).await);

        assert_eq!(mixer.peak_audible(), 1);
        let rain = element(&mixer, SoundId::Rain);
        assert!(rain.paused);
        assert_eq!(rain.volume, 0.0);
        assert!(rain.at_start);
        assert_eq!(audio.current_track(), Some(SoundId::Ocean));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoplay_block_is_a_false_return() {
        let mixer = VirtualMixer::new();
        let audio = manager(&mixer);

        assert!(!audio.play_track(SoundId::Rain).await);
        assert!(!audio.is_playing());

        audio.unlock();
        audio.unlock();
        assert!(audio.status().unlocked);
        assert!(audio.play_track(SoundId::Rain).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_asset_fails_quietly() {
        let mixer = VirtualMixer::unlocked();
        mixer.mark_missing(SoundId::White);
        let audio = manager(&mixer);
        assert!(!audio.play_track(SoundId::White).await);
        assert!(!audio.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_position_and_resume_fades_back() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.play_track(SoundId::Cafe).await;

        audio.pause().await;
        let cafe = element(&mixer, SoundId::Cafe);
        assert!(cafe.paused);
        assert_eq!(cafe.volume, 0.0);
        assert!(!cafe.at_start);
        assert_eq!(audio.current_track(), Some(SoundId::Cafe));

        assert!(audio.resume().await);
        assert_eq!(element(&mixer, SoundId::Cafe).volume, 0.6);
        assert!(!audio.resume().await);

        // Playing the paused track again resumes rather than rewinding
        audio.pause().await;
        audio.play_track(SoundId::Cafe).await;
        assert!(!element(&mixer, SoundId::Cafe).at_start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.play_track(SoundId::Rain).await;

        audio.stop().await;
        let once = (audio.status(), mixer.snapshot());
        audio.stop().await;
        assert_eq!((audio.status(), mixer.snapshot()), once);
        assert_eq!(audio.current_track(), None);
        assert!(!audio.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_none_stops() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.play_track(SoundId::Rain).await;
        assert!(audio.play_track(SoundId::None).await);
        assert_eq!(audio.current_track(), None);
        assert!(element(&mixer, SoundId::Rain).paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_volume_applies_while_playing() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.play_track(SoundId::Rain).await;

        audio.set_volume(30);
        assert_eq!(element(&mixer, SoundId::Rain).volume, 0.3);
        audio.set_volume(250);
        assert_eq!(element(&mixer, SoundId::Rain).volume, 1.0);
        audio.set_volume(-5);
        assert_eq!(element(&mixer, SoundId::Rain).volume, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_cancels_fade_and_is_repeatable() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);

        let playing = {
            let audio = Arc::clone(&audio);
            tokio::spawn(async move { audio.play_track(SoundId::Rain).await })
        };
        tokio::time::sleep(Duration::from_millis(120)).await;
        audio.destroy().await;
        audio.destroy().await;
        playing.await.unwrap();

        let rain = element(&mixer, SoundId::Rain);
        assert!(rain.paused);
        assert_eq!(rain.volume, 0.0);
        assert_eq!(audio.current_track(), None);
        assert!(!audio.play_track(SoundId::Rain).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_restores_previous_track() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.play_track(SoundId::Rain).await;

        assert!(audio.preview(SoundId::Ocean, PREVIEW_DURATION).await);
        assert_eq!(audio.current_track(), Some(SoundId::Ocean));

        tokio::time::sleep(PREVIEW_DURATION + Duration::from_secs(3)).await;
        assert_eq!(audio.current_track(), Some(SoundId::Rain));
        assert!(audio.is_playing());
        assert_eq!(mixer.peak_audible(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_volume_during_fade_out_keeps_heading_to_silence() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.play_track(SoundId::Rain).await;

        let pausing = {
            let audio = Arc::clone(&audio);
            tokio::spawn(async move { audio.pause().await })
        };
        tokio::time::sleep(Duration::from_millis(120)).await;
        let before = element(&mixer, SoundId::Rain).volume;
        assert!(before > 0.0 && before < 0.6);

        audio.set_volume(100);
        assert_eq!(audio.status().volume, 1.0);
        assert!(element(&mixer, SoundId::Rain).volume <= before);

        pausing.await.unwrap();
        let rain = element(&mixer, SoundId::Rain);
        assert_eq!(rain.volume, 0.0);
        assert!(rain.paused);
        assert_eq!(mixer.peak_audible(), 1);

        // The new level is used by the next fade-in
        assert!(audio.resume().await);
        assert_eq!(element(&mixer, SoundId::Rain).volume, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_volume_during_fade_in_moves_the_target() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);

        let playing = {
            let audio = Arc::clone(&audio);
            tokio::spawn(async move { audio.play_track(SoundId::Ocean).await })
        };
        tokio::time::sleep(Duration::from_millis(220)).await;
        let mid = element(&mixer, SoundId::Ocean).volume;
        assert!(mid > 0.0 && mid < 0.6);

        audio.set_volume(20);
        assert!(playing.await.unwrap());
        assert_eq!(element(&mixer, SoundId::Ocean).volume, 0.2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claimed_preview_keeps_playing() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);

        assert!(audio.preview(SoundId::Rain, PREVIEW_DURATION).await);
        assert!(!audio.claim(SoundId::Ocean));
        assert!(audio.claim(SoundId::Rain));

        tokio::time::sleep(PREVIEW_DURATION + Duration::from_secs(3)).await;
        assert_eq!(audio.current_track(), Some(SoundId::Rain));
        assert!(audio.is_playing());
        assert_eq!(element(&mixer, SoundId::Rain).volume, 0.6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_of_playing_track_leaves_it_alone() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);
        audio.play_track(SoundId::Cafe).await;

        assert!(audio.preview(SoundId::Cafe, PREVIEW_DURATION).await);
        tokio::time::sleep(PREVIEW_DURATION + Duration::from_secs(3)).await;
        assert_eq!(audio.current_track(), Some(SoundId::Cafe));
        assert!(audio.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclaimed_preview_stops_when_nothing_played_before() {
        let mixer = VirtualMixer::unlocked();
        let audio = manager(&mixer);

        assert!(audio.preview(SoundId::White, PREVIEW_DURATION).await);
        tokio::time::sleep(PREVIEW_DURATION + Duration::from_secs(3)).await;
        assert_eq!(audio.current_track(), None);
        assert!(element(&mixer, SoundId::White).paused);
    }
}
