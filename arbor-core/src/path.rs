//! Path Algebra
//!
//! Slash-separated string paths are the addressing scheme of the state store.
//! Every path that reaches the store is first normalized with [`clean`], so
//! two spellings of the same location always intern to the same entry.
//!
//! The functions here are purely lexical. They never look at the state tree.

use smallvec::SmallVec;

/// Path separator.
pub const SEPARATOR: char = '/';

/// Root path of the state tree.
pub const ROOT: &str = "/";

/// Segment list for a path. Most state paths are shallow.
pub type Segments<'a> = SmallVec<[&'a str; 8]>;

/// Output buffer for [`clean`] that only allocates once the output diverges
/// from the input.
struct LazyBuf<'a> {
    source: &'a [u8],
    buf: Option<Vec<u8>>,
    w: usize,
}

impl<'a> LazyBuf<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            buf: None,
            w: 0,
        }
    }

    fn index(&self, i: usize) -> u8 {
        match &self.buf {
            Some(buf) => buf[i],
            None => self.source[i],
        }
    }

    fn append(&mut self, c: u8) {
        if self.buf.is_none() {
            if self.w < self.source.len() && self.source[self.w] == c {
                self.w += 1;
                return;
            }
            let mut buf = Vec::with_capacity(self.source.len());
            buf.extend_from_slice(&self.source[..self.w]);
            self.buf = Some(buf);
        }
        if let Some(buf) = self.buf.as_mut() {
            buf.truncate(self.w);
            buf.push(c);
        }
        self.w += 1;
    }

    fn into_string(self) -> String {
        let bytes = match &self.buf {
            Some(buf) => &buf[..self.w],
            None => &self.source[..self.w],
        };
        // Segments are copied whole, so the bytes stay valid UTF-8.
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Return the shortest lexically equivalent path.
///
/// Runs of separators collapse to one, `.` segments are dropped and `..`
/// removes the segment before it. An absolute path never ascends above the
/// root; a relative path keeps leading `..` segments. The empty path cleans
/// to `"."`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let bytes = path.as_bytes();
    let n = bytes.len();
    let rooted = bytes[0] == b'/';
    let mut out = LazyBuf::new(path);

    let mut r = 0;
    let mut dotdot = 0;
    if rooted {
        out.append(b'/');
        r = 1;
        dotdot = 1;
    }

    while r < n {
        if bytes[r] == b'/' {
            r += 1;
        } else if bytes[r] == b'.' && (r + 1 == n || bytes[r + 1] == b'/') {
            r += 1;
        } else if bytes[r] == b'.'
            && bytes.get(r + 1) == Some(&b'.')
            && (r + 2 == n || bytes[r + 2] == b'/')
        {
            r += 2;
            if out.w > dotdot {
                out.w -= 1;
                while out.w > dotdot && out.index(out.w) != b'/' {
                    out.w -= 1;
                }
            } else if !rooted {
                if out.w > 0 {
                    out.append(b'/');
                }
                out.append(b'.');
                out.append(b'.');
                dotdot = out.w;
            }
        } else {
            if (rooted && out.w != 1) || (!rooted && out.w != 0) {
                out.append(b'/');
            }
            while r < n && bytes[r] != b'/' {
                out.append(bytes[r]);
                r += 1;
            }
        }
    }

    if out.w == 0 {
        return ".".to_string();
    }
    out.into_string()
}

/// Join segments with the separator and clean the result.
///
/// Leading empty segments are skipped. Joining nothing but empty segments
/// yields the empty string.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    match segments.iter().position(|s| !s.as_ref().is_empty()) {
        Some(first) => {
            let joined = segments[first..]
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join("/");
            clean(&joined)
        }
        None => String::new(),
    }
}

/// Whether the path starts at the root.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Split immediately after the last separator.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    }
}

/// All but the last element of the path, cleaned.
pub fn dir(path: &str) -> String {
    clean(split(path).0)
}

/// Non-empty segments of a path.
pub fn segments(path: &str) -> Segments<'_> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Path of a direct child.
pub fn child(base: &str, key: &str) -> String {
    clean(&format!("{base}/{key}"))
}

/// Segment-aware prefix test on clean paths.
///
/// `/a` is a prefix of `/a` and `/a/b` but not of `/ab`. The root is a
/// prefix of every absolute path.
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == ROOT {
        return is_absolute(path);
    }
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Whether either path lies under the other.
pub fn related(a: &str, b: &str) -> bool {
    has_prefix(a, b) || has_prefix(b, a)
}

/// Resolve a reference target relative to the directory of the cell that
/// holds it.
pub fn resolve(holder: &str, target: &str) -> String {
    if is_absolute(target) {
        clean(target)
    } else {
        join(&[dir(holder).as_str(), target])
    }
}
