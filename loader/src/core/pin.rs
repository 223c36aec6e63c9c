//! # Pin
//!
//! Pins attached links so they outlive the process. A link that could not be
//! pinned is dropped, and reclaimed by the kernel, as nothing references it
//! once we exit.

use std::path::Path;

use super::{errors::DirectiveError, module::PinnableLink};

pub(crate) fn persist<L: PinnableLink>(mut link: L, path: &Path) -> Result<(), DirectiveError> {
    link.pin(path)
        .map_err(|source| DirectiveError::PinFailed {
            path: path.to_path_buf(),
            source,
        })?;

    // The pin holds the link from now on.
    link.disconnect();
    println!("  ✓ Link pinned at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::core::module::{testing::*, Module, ProgramRef};

    #[test]
    fn pin_and_disconnect() {
        let mut module = FakeModule::new(&[("prog1", "kprobe/__kmalloc")]);
        let link = module
            .attach_kprobe(&ProgramRef::new("prog1"), "__kmalloc", false)
            .unwrap();

        assert!(persist(link, Path::new("/sys/fs/bpf/a")).is_ok());

        let record = module.record.borrow();
        assert_eq!(record.pinned, vec![PathBuf::from("/sys/fs/bpf/a")]);
        assert_eq!(record.disconnected, 1);
    }

    #[test]
    fn pin_failure() {
        let mut module = FakeModule::new(&[("prog1", "kprobe/__kmalloc")]);
        let link = module
            .attach_kprobe(&ProgramRef::new("prog1"), "__kmalloc", false)
            .unwrap();

        let path = format!("/sys/fs/bpf/{BAD_PIN}");
        match persist(link, Path::new(&path)) {
            Err(DirectiveError::PinFailed { path: p, .. }) => assert_eq!(p, PathBuf::from(&path)),
            _ => panic!("pinning should fail"),
        }

        // A link that was not pinned is left to be reclaimed.
        let record = module.record.borrow();
        assert!(record.pinned.is_empty());
        assert_eq!(record.disconnected, 0);
    }
}
