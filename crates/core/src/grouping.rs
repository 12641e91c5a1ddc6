//! Collapsing of long runs of tool output.

use crate::conversation::NormalizedMessage;
use crate::helpers::ELLIPSIS;

/// Runs of consecutive system messages at least this long are collapsed.
pub const COLLAPSE_RUN_LENGTH: usize = 3;

/// Collapse every run of three or more consecutive `system` messages into
/// `[first, "...", last]`. The ellipsis takes the timestamp of the run's
/// second message.
///
/// Every other kind passes through in place and ends the current run, so
/// TODO updates are never hidden. Applying this twice equals applying it once.
pub fn group_consecutive_system_messages(
    messages: Vec<NormalizedMessage>,
) -> Vec<NormalizedMessage> {
    let mut result = Vec::with_capacity(messages.len());
    let mut run: Vec<NormalizedMessage> = Vec::new();

    for message in messages {
        if message.is_system() {
            run.push(message);
        } else {
            flush_run(&mut run, &mut result);
            result.push(message);
        }
    }
    flush_run(&mut run, &mut result);

    result
}

fn flush_run(run: &mut Vec<NormalizedMessage>, out: &mut Vec<NormalizedMessage>) {
    if run.len() < COLLAPSE_RUN_LENGTH {
        out.append(run);
        return;
    }

    let ellipsis = NormalizedMessage::system(ELLIPSIS, run[1].timestamp.clone());
    let mut drained = run.drain(..);
    let first = drained.next();
    let last = drained.next_back();
    drop(drained);

    out.extend(first);
    out.push(ellipsis);
    out.extend(last);
}
