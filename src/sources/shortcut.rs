//! Start-Menu shortcuts and the `.lnk` (Shell Link) target resolver.

use crate::error::ScanError;
use crate::model::{Provenance, RawCandidate};
use crate::normalize::normalize_name;
use crate::sources::exe::{expand_env, is_executable};
use crate::sources::Source;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const HEADER_SIZE: usize = 0x4C;
const LINK_CLSID: [u8; 16] = [
    0x01, 0x14, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46,
];

const HAS_TARGET_ID_LIST: u32 = 0x0000_0001;
const HAS_LINK_INFO: u32 = 0x0000_0002;
const HAS_NAME: u32 = 0x0000_0004;
const HAS_RELATIVE_PATH: u32 = 0x0000_0008;
const HAS_WORKING_DIR: u32 = 0x0000_0010;
const HAS_ARGUMENTS: u32 = 0x0000_0020;
const HAS_ICON_LOCATION: u32 = 0x0000_0040;
const IS_UNICODE: u32 = 0x0000_0080;

const VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 0x0000_0001;
const ENVIRONMENT_BLOCK_SIGNATURE: u32 = 0xA000_0001;

/// Paths a shell link points at, as stored in the file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShellLink {
    pub local_base_path: Option<String>,
    pub relative_path: Option<String>,
    pub env_target: Option<String>,
}

impl ShellLink {
    /// Best target path: LinkInfo, then the environment block, then the relative path.
    pub fn target(&self, link_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = &self.local_base_path {
            return Some(PathBuf::from(path));
        }
        if let Some(path) = &self.env_target {
            return Some(PathBuf::from(expand_env(path)));
        }
        let relative = self.relative_path.as_ref()?;
        Some(link_dir.join(relative.replace('\\', std::path::MAIN_SEPARATOR_STR)))
    }
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn u16_at(&self, at: usize) -> Option<u16> {
        let bytes = self.data.get(at..at + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32_at(&self, at: usize) -> Option<u32> {
        let bytes = self.data.get(at..at + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn cstr_at(&self, at: usize) -> Option<String> {
        let rest = self.data.get(at..)?;
        let end = rest.iter().position(|b| *b == 0)?;
        Some(String::from_utf8_lossy(&rest[..end]).into_owned())
    }

    fn wstr_at(&self, at: usize) -> Option<String> {
        let mut units = Vec::new();
        let mut pos = at;
        loop {
            let unit = self.u16_at(pos)?;
            if unit == 0 {
                break;
            }
            units.push(unit);
            pos += 2;
        }
        Some(String::from_utf16_lossy(&units))
    }
}

/// Parses a Shell Link binary. Returns `None` if the data is not a shell link
/// or is truncated before the fields we need.
pub fn parse_shell_link(data: &[u8]) -> Option<ShellLink> {
    let r = Reader { data };
    if r.u32_at(0)? as usize != HEADER_SIZE || data.get(4..20)? != LINK_CLSID {
        return None;
    }
    let flags = r.u32_at(20)?;
    let mut pos = HEADER_SIZE;
    let mut link = ShellLink::default();

    if flags & HAS_TARGET_ID_LIST != 0 {
        pos += 2 + r.u16_at(pos)? as usize;
    }

    if flags & HAS_LINK_INFO != 0 {
        let info_size = r.u32_at(pos)? as usize;
        let header_size = r.u32_at(pos + 4)? as usize;
        let info_flags = r.u32_at(pos + 8)?;
        if info_flags & VOLUME_ID_AND_LOCAL_BASE_PATH != 0 {
            let suffix_offset = r.u32_at(pos + 24)? as usize;
            let (base, suffix) = if header_size >= 0x24 {
                let base_offset = r.u32_at(pos + 28)? as usize;
                let suffix_offset_w = r.u32_at(pos + 32)? as usize;
                (r.wstr_at(pos + base_offset), r.wstr_at(pos + suffix_offset_w))
            } else {
                let base_offset = r.u32_at(pos + 16)? as usize;
                (r.cstr_at(pos + base_offset), r.cstr_at(pos + suffix_offset))
            };
            if let Some(base) = base.filter(|b| !b.is_empty()) {
                let suffix = suffix.unwrap_or_default();
                link.local_base_path = Some(format!("{}{}", base, suffix));
            }
        }
        pos += info_size;
    }

    let unicode = flags & IS_UNICODE != 0;
    let read_string = |pos: &mut usize| -> Option<String> {
        let count = r.u16_at(*pos)? as usize;
        *pos += 2;
        let value = if unicode {
            let bytes = data.get(*pos..*pos + count * 2)?;
            let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
            *pos += count * 2;
            String::from_utf16_lossy(&units)
        } else {
            let bytes = data.get(*pos..*pos + count)?;
            *pos += count;
            String::from_utf8_lossy(bytes).into_owned()
        };
        Some(value)
    };

    if flags & HAS_NAME != 0 {
        read_string(&mut pos)?;
    }
    if flags & HAS_RELATIVE_PATH != 0 {
        link.relative_path = read_string(&mut pos);
    }
    // Skipped, but they still have to be stepped over
    for flag in [HAS_WORKING_DIR, HAS_ARGUMENTS, HAS_ICON_LOCATION] {
        if flags & flag != 0 && read_string(&mut pos).is_none() {
            return Some(link);
        }
    }

    // Extra data blocks, terminated by a size below 4
    while let Some(size) = r.u32_at(pos) {
        let size = size as usize;
        if size < 4 {
            break;
        }
        if r.u32_at(pos + 4) == Some(ENVIRONMENT_BLOCK_SIGNATURE) {
            let unicode_target = r.wstr_at(pos + 8 + 260).filter(|s| !s.is_empty());
            link.env_target = unicode_target.or_else(|| r.cstr_at(pos + 8).filter(|s| !s.is_empty()));
        }
        pos += size;
    }

    Some(link)
}

/// Resolves a shortcut file to the executable it points at.
pub fn resolve_shortcut(path: &Path) -> Option<PathBuf> {
    let data = fs::read(path).ok()?;
    let link = parse_shell_link(&data)?;
    link.target(path.parent().unwrap_or_else(|| Path::new(".")))
}

pub struct StartMenuSource {
    dirs: Vec<PathBuf>,
}

impl StartMenuSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl Source for StartMenuSource {
    fn kind(&self) -> Provenance {
        Provenance::StartMenu
    }

    fn scan(&self) -> Result<Vec<RawCandidate>, ScanError> {
        let mut entries = Vec::new();

        for dir in &self.dirs {
            if !dir.exists() {
                continue;
            }
            debug!("Scanning shortcuts in {:?}", dir);
            for entry in WalkDir::new(dir).sort_by_file_name().into_iter().flatten() {
                let path = entry.path();
                let is_lnk = path
                    .extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.eq_ignore_ascii_case("lnk"));
                if !is_lnk {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                if normalize_name(name).is_none() {
                    continue;
                }
                match resolve_shortcut(path) {
                    Some(target) if is_executable(&target) => {
                        entries.push(RawCandidate::classic(name, target, Provenance::StartMenu));
                    }
                    Some(target) => debug!("Shortcut {:?} points at non-executable {:?}", path, target),
                    None => debug!("Shortcut {:?} could not be resolved", path),
                }
            }
        }

        info!("StartMenuSource: found {} candidates", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LaunchDescriptor;
    use crate::sources::exe::testutil::make_exe;

    fn header(flags: u32) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
        data[4..20].copy_from_slice(&LINK_CLSID);
        data[20..24].copy_from_slice(&flags.to_le_bytes());
        data
    }

    /// Shell link with an ANSI LinkInfo local base path.
    fn link_with_local_path(target: &str) -> Vec<u8> {
        let mut data = header(HAS_TARGET_ID_LIST | HAS_LINK_INFO);
        // Opaque ID list
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&[0xAA, 0xBB, 0x00, 0x00]);

        let header_size = 0x1Cu32;
        let base_offset = header_size;
        let suffix_offset = base_offset + target.len() as u32 + 1;
        let info_size = suffix_offset + 1;
        data.extend_from_slice(&info_size.to_le_bytes());
        data.extend_from_slice(&header_size.to_le_bytes());
        data.extend_from_slice(&VOLUME_ID_AND_LOCAL_BASE_PATH.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // VolumeIDOffset
        data.extend_from_slice(&base_offset.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // CommonNetworkRelativeLinkOffset
        data.extend_from_slice(&suffix_offset.to_le_bytes());
        data.extend_from_slice(target.as_bytes());
        data.push(0);
        data.push(0); // empty suffix
        data.extend_from_slice(&0u32.to_le_bytes()); // terminal block
        data
    }

    fn utf16_string(value: &str) -> Vec<u8> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let mut out = (units.len() as u16).to_le_bytes().to_vec();
        for unit in units {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    #[test]
    fn reads_local_base_path_from_link_info() {
        let data = link_with_local_path(r"C:\Program Files\VideoLAN\VLC\vlc.exe");
        let link = parse_shell_link(&data).unwrap();
        assert_eq!(link.local_base_path.as_deref(), Some(r"C:\Program Files\VideoLAN\VLC\vlc.exe"));
        assert_eq!(
            link.target(Path::new("/menu")),
            Some(PathBuf::from(r"C:\Program Files\VideoLAN\VLC\vlc.exe"))
        );
    }

    #[test]
    fn reads_unicode_string_data() {
        let mut data = header(HAS_NAME | HAS_RELATIVE_PATH | HAS_ARGUMENTS | IS_UNICODE);
        data.extend(utf16_string("Lecteur vidéo"));
        data.extend(utf16_string(r"..\bin\player.exe"));
        data.extend(utf16_string("--fullscreen"));

        let link = parse_shell_link(&data).unwrap();
        assert_eq!(link.relative_path.as_deref(), Some(r"..\bin\player.exe"));
        assert_eq!(link.local_base_path, None);
    }

    #[test]
    fn steps_over_working_dir_and_arguments() {
        let mut data = header(HAS_RELATIVE_PATH | HAS_WORKING_DIR | HAS_ARGUMENTS | IS_UNICODE);
        data.extend(utf16_string(r"..\bin\player.exe"));
        data.extend(utf16_string(r"C:\Users\Public"));
        data.extend(utf16_string("--fullscreen"));
        let mut block = vec![0u8; 0x314];
        block[0..4].copy_from_slice(&0x314u32.to_le_bytes());
        block[4..8].copy_from_slice(&ENVIRONMENT_BLOCK_SIGNATURE.to_le_bytes());
        let target = b"%ProgramFiles%\\Player\\player.exe";
        block[8..8 + target.len()].copy_from_slice(target);
        data.extend(block);
        data.extend_from_slice(&0u32.to_le_bytes());

        let link = parse_shell_link(&data).unwrap();
        assert_eq!(link.relative_path.as_deref(), Some(r"..\bin\player.exe"));
        assert_eq!(link.env_target.as_deref(), Some(r"%ProgramFiles%\Player\player.exe"));
    }

    #[test]
    fn truncated_arguments_keep_earlier_fields() {
        let mut data = header(HAS_RELATIVE_PATH | HAS_ARGUMENTS | IS_UNICODE);
        data.extend(utf16_string(r"..\bin\player.exe"));
        data.extend_from_slice(&40u16.to_le_bytes());

        let link = parse_shell_link(&data).unwrap();
        assert_eq!(link.relative_path.as_deref(), Some(r"..\bin\player.exe"));
        assert_eq!(link.env_target, None);
    }

    #[test]
    fn reads_environment_block_target() {
        let mut data = header(0);
        let mut block = vec![0u8; 0x314];
        block[0..4].copy_from_slice(&0x314u32.to_le_bytes());
        block[4..8].copy_from_slice(&ENVIRONMENT_BLOCK_SIGNATURE.to_le_bytes());
        let target = b"%ProgramFiles%\\Tool\\tool.exe";
        block[8..8 + target.len()].copy_from_slice(target);
        data.extend(block);
        data.extend_from_slice(&0u32.to_le_bytes());

        let link = parse_shell_link(&data).unwrap();
        assert_eq!(link.env_target.as_deref(), Some(r"%ProgramFiles%\Tool\tool.exe"));
    }

    #[test]
    fn rejects_non_links_and_truncated_data() {
        assert_eq!(parse_shell_link(b"not a shortcut"), None);
        let data = link_with_local_path(r"C:\x.exe");
        assert_eq!(parse_shell_link(&data[..HEADER_SIZE + 3]), None);
    }

    #[test]
    fn start_menu_resolves_links_to_existing_executables() {
        let dir = tempfile::tempdir().unwrap();
        let menu = dir.path().join("Programs").join("Media");
        fs::create_dir_all(&menu).unwrap();
        let exe = make_exe(&dir.path().join("apps"), "player");

        fs::write(menu.join("Player.lnk"), link_with_local_path(&exe.display().to_string())).unwrap();
        fs::write(menu.join("Broken.lnk"), link_with_local_path("/nowhere/broken")).unwrap();
        fs::write(menu.join("Uninstall Player.lnk"), link_with_local_path(&exe.display().to_string())).unwrap();
        fs::write(menu.join("notes.txt"), b"x").unwrap();

        let source = StartMenuSource::new(vec![dir.path().join("Programs"), dir.path().join("missing")]);
        let found = source.scan().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_name, "Player");
        assert_eq!(found[0].source, Provenance::StartMenu);
        assert_eq!(found[0].launch, LaunchDescriptor::Classic(exe));
    }
}
