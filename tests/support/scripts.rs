use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use steelscan::jobs::{JobCommand, UiDispatcher};

const WAIT_LIMIT: Duration = Duration::from_secs(20);

/// `sh -c <script>` as a job command.
pub fn shell(script: &str) -> JobCommand {
    JobCommand::new("sh").arg("-c").arg(script)
}

/// Write an engine stand-in script that `sh` will run with the engine's flags.
pub fn write_engine_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write engine script");
    path
}

/// Run scheduled tasks against `context` until `done` holds or the wait limit passes.
pub fn pump_until<C>(
    dispatcher: &UiDispatcher<C>,
    context: &mut C,
    mut done: impl FnMut(&C) -> bool,
) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        dispatcher.run_pending(context);
        if done(context) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Poll `check` until it holds or the wait limit passes.
pub fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}
