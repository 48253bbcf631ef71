use crate::synth::Voice;

/// Commands crossing from the scheduler thread into the audio callback.
#[derive(Clone, Debug)]
pub enum AudioCommand {
    /// One committed step's worth of voices, already stamped with absolute
    /// start frames in the output clock. The engine holds them until their
    /// trigger time arrives, which is what makes playback sample-accurate
    /// despite the coarse scheduler poll.
    Play(Vec<Voice>),
}
