//! Keystore inspector: runs `keytool -list -v` and parses the report.

use tracing::debug;

use super::listing::parse_listing;
use super::Snapshot;
use crate::error::InspectError;
use crate::infrastructure::keytool::KeytoolCommands;
use crate::infrastructure::ToolRunner;
use crate::types::KeystoreRef;


pub struct Inspector<'a, R: ToolRunner> {
    runner: &'a R,
    commands: &'a KeytoolCommands,
    missing_markers: &'a [String],
}

impl<'a, R: ToolRunner> Inspector<'a, R> {
    pub fn new(runner: &'a R, commands: &'a KeytoolCommands, missing_markers: &'a [String]) -> Self {
        Inspector {
            runner,
            commands,
            missing_markers,
        }
    }

    /// Capture the keystore's current entries. A keystore that keytool
    /// reports as missing yields an empty snapshot.
    pub fn inspect(&self, store: &KeystoreRef) -> Result<Snapshot, InspectError> {
        let output = self.runner.run(&self.commands.list(store))?;
        if !output.success() {
            if output.mentions_any(self.missing_markers) {
                debug!(keystore = %store.path.display(), "keystore does not exist yet");
                return Ok(Snapshot::missing());
            }
            return Err(InspectError::Tool {
                exit_code: output.exit_code,
                diagnostic: output.diagnostic(),
            });
        }
        let snapshot = parse_listing(&output.stdout)?;
        debug!(
            keystore = %store.path.display(),
            entries = snapshot.len(),
            malformed = snapshot.malformed().len(),
            "inspected"
        );
        Ok(snapshot)
    }
}
