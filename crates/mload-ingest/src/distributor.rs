//! Feeds records into the job queue

use crate::queue::JobSender;
use crate::tracker::CompletionTracker;
use mload_common::Movie;
use tracing::{debug, error};

/// Submit `movies` in order, then close the queue.
///
/// The tracker is incremented before each send so the count can never reach
/// zero while a record is on its way to a worker. Returns the number of
/// records handed to the queue; fewer than `movies.len()` only when every
/// worker has already exited.
pub async fn distribute(
    movies: Vec<Movie>,
    jobs: JobSender<Movie>,
    tracker: &CompletionTracker,
) -> usize {
    let total = movies.len();
    let mut submitted = 0;

    for movie in movies {
        tracker.add(1);
        let id = movie.id.clone();

        if jobs.send(movie).await.is_err() {
            // Never reached a worker, so nobody else will mark it done.
            tracker.done();
            error!(
                id = %id,
                submitted,
                total,
                "Job queue closed before all movies were distributed"
            );
            break;
        }

        submitted += 1;
    }

    jobs.close();
    debug!(submitted, "Distribution finished, job queue closed");
    submitted
}
