use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Make `path` absolute against `base` and normalize it lexically.
///
/// `.` components are dropped and `..` removes the previous component; `..`
/// at the root stays at the root. Symlinks are not resolved, and a trailing
/// separator is not kept.
pub fn absolutize(path: impl AsRef<Utf8Path>, base: &Utf8Path) -> Utf8PathBuf {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = Utf8PathBuf::new();
    for component in joined.components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir => normalized.push(component.as_str()),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if normalized.parent().is_some() {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Utf8Component::Normal(name) => normalized.push(name),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_joins_base() {
        let base = Utf8Path::new("/home/dxr");
        assert_eq!(absolutize("target", base), Utf8PathBuf::from("/home/dxr/target"));
        assert_eq!(absolutize("./a/./b", base), Utf8PathBuf::from("/home/dxr/a/b"));
    }

    #[test]
    fn test_absolute_path_ignores_base() {
        let base = Utf8Path::new("/home/dxr");
        assert_eq!(absolutize("/tmp/dxr-temp/", base), Utf8PathBuf::from("/tmp/dxr-temp"));
    }

    #[test]
    fn test_parent_components_collapse() {
        let base = Utf8Path::new("/home/dxr/bin");
        assert_eq!(absolutize("../templates/mozilla", base), Utf8PathBuf::from("/home/dxr/templates/mozilla"));
        assert_eq!(absolutize("/../../etc", base), Utf8PathBuf::from("/etc"));
    }

    #[test]
    fn test_empty_path_is_base() {
        let base = Utf8Path::new("/home/dxr");
        assert_eq!(absolutize("", base), Utf8PathBuf::from("/home/dxr"));
    }
}
