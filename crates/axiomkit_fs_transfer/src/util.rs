use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use encoding_rs::{CoderResult, Encoding, UTF_8};
use filetime::{FileTime, set_file_mtime};
use tracing::warn;

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

fn _push_lexical<'a, I>(mut path_base: PathBuf, iter_comps: I) -> PathBuf
where
    I: Iterator<Item = Component<'a>>,
{
    for comp in iter_comps {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                path_base.pop();
            }
            _ => path_base.push(comp.as_os_str()),
        }
    }
    path_base
}

/// Resolve `path` for identity comparisons.
///
/// The longest existing prefix is canonicalized (links and `..` resolved);
/// components below it that do not exist yet are applied lexically.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let path_abs = _absolutize_path(path);
    let l_comps: Vec<Component> = path_abs.components().collect();
    for n_keep in (1..=l_comps.len()).rev() {
        let path_prefix: PathBuf = l_comps[..n_keep].iter().collect();
        if let Ok(path_resolved) = fs::canonicalize(&path_prefix) {
            return _push_lexical(path_resolved, l_comps[n_keep..].iter().copied());
        }
    }
    _push_lexical(PathBuf::new(), l_comps.into_iter())
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = normalize_path(src);
    let dst_resolved = normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Absolute form of `path` for error messages.
pub(crate) fn absolute_path(path: &Path) -> PathBuf {
    _absolutize_path(path)
}

/// `true` when the path itself (not its target) is present.
pub(crate) fn path_exists_nofollow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Name without its last `.suffix`. A leading dot alone is not an extension.
pub(crate) fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(n_idx) if n_idx > 0 => &name[..n_idx],
        _ => name,
    }
}

/// Extension including the dot, or `""`.
pub(crate) fn extension_of(name: &str) -> &str {
    &name[strip_extension(name).len()..]
}

/// `name` without a trailing `suffix_lower`, comparing Unicode-lowercased tails.
///
/// `suffix_lower` must already be lowercase. An empty suffix never matches.
pub(crate) fn strip_suffix_ignore_case<'a>(
    name: &'a str,
    suffix_lower: &str,
) -> Option<&'a str> {
    if suffix_lower.is_empty() {
        return None;
    }
    name.char_indices()
        .rev()
        .map(|(n_idx, _)| n_idx)
        .find(|&n_idx| name[n_idx..].to_lowercase() == suffix_lower)
        .map(|n_idx| &name[..n_idx])
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PatternTranslation

/// Translate a `*`/`?` wildcard into an anchored regular expression.
///
/// All other characters are matched literally.
pub(crate) fn wildcard_to_regex(pattern: &str) -> String {
    let mut c_regex = String::with_capacity(pattern.len() + 8);
    c_regex.push('^');
    let mut buf_char = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => c_regex.push_str(".*"),
            '?' => c_regex.push('.'),
            _ => c_regex.push_str(&regex::escape(ch.encode_utf8(&mut buf_char))),
        }
    }
    c_regex.push('$');
    c_regex
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Encoding

/// Look up an encoding label, falling back to UTF-8 for `None` or unknown labels.
pub(crate) fn resolve_encoding(label: Option<&str>) -> &'static Encoding {
    let Some(label) = label else {
        return UTF_8;
    };
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => encoding,
        None => {
            warn!("Unknown encoding label {label:?}; falling back to UTF-8");
            UTF_8
        }
    }
}

/// Stream bytes unchanged. Returns the byte count.
pub(crate) fn copy_bytes<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    n_bytes_chunk: usize,
) -> io::Result<u64> {
    let mut buf_read = vec![0u8; n_bytes_chunk.max(1)];
    let mut n_total = 0_u64;
    loop {
        let n_read = match reader.read(&mut buf_read) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf_read[..n_read])?;
        n_total += n_read as u64;
    }
    Ok(n_total)
}

/// Decode `reader` as `encoding_src` and write it re-encoded as `encoding_dst`.
///
/// Malformed input becomes U+FFFD; characters the destination cannot
/// represent become numeric character references. Returns bytes written.
pub(crate) fn transcode_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    encoding_src: &'static Encoding,
    encoding_dst: &'static Encoding,
    n_bytes_chunk: usize,
) -> io::Result<u64> {
    let mut decoder = encoding_src.new_decoder_without_bom_handling();
    let mut encoder = encoding_dst.new_encoder();
    let mut buf_read = vec![0u8; n_bytes_chunk.max(1)];
    let mut txt_decoded = String::new();
    let mut buf_encoded: Vec<u8> = Vec::new();
    let mut n_total = 0_u64;

    loop {
        let n_read = match reader.read(&mut buf_read) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let b_last = n_read == 0;

        txt_decoded.clear();
        let n_cap_decoded = decoder
            .max_utf8_buffer_length(n_read)
            .ok_or_else(|| io::Error::other("decode buffer length overflow"))?;
        txt_decoded.reserve(n_cap_decoded);
        let (_, _, _) = decoder.decode_to_string(&buf_read[..n_read], &mut txt_decoded, b_last);

        let mut txt_rest = txt_decoded.as_str();
        loop {
            buf_encoded.clear();
            let n_cap_encoded = encoder
                .max_buffer_length_from_utf8_if_no_unmappables(txt_rest.len())
                .unwrap_or(n_bytes_chunk)
                .max(16);
            buf_encoded.reserve(n_cap_encoded);
            let (res_coder, n_consumed, _) =
                encoder.encode_from_utf8_to_vec(txt_rest, &mut buf_encoded, b_last);
            writer.write_all(&buf_encoded)?;
            n_total += buf_encoded.len() as u64;
            txt_rest = &txt_rest[n_consumed..];
            if res_coder == CoderResult::InputEmpty {
                break;
            }
        }

        if b_last {
            break;
        }
    }
    Ok(n_total)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Metadata

/// Set `path_file_dst` modification time to that of `path_file_src`.
pub(crate) fn copy_last_modified(path_file_src: &Path, path_file_dst: &Path) -> io::Result<()> {
    let stat_src = fs::metadata(path_file_src)?;
    set_file_mtime(
        path_file_dst,
        FileTime::from_last_modification_time(&stat_src),
    )
}

/// Best-effort extended attribute copy; unreadable names are skipped.
#[cfg(target_os = "linux")]
pub(crate) fn copy_xattrs(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Failed to list extended attributes of {} ({e})",
                path_file_src.display()
            );
            return;
        }
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            warn!(
                "Failed to set extended attribute {:?} on {} ({e})",
                name,
                path_file_dst.display()
            );
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn copy_xattrs(_path_file_src: &Path, _path_file_dst: &Path) {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
