use winreg::RegKey;
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};

/// Returns the Steam base directory on Windows using the registry.
pub(crate) fn steam_root() -> Option<String> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);

    // Per-user key written by the Steam client itself.
    if let Some(path) = read_value(&hkcu, r"Software\Valve\Steam", "SteamPath") {
        return Some(path);
    }

    // 64-bit registry view, then 32-bit.
    read_value(&hklm, r"SOFTWARE\Wow6432Node\Valve\Steam", "InstallPath")
        .or_else(|| read_value(&hklm, r"SOFTWARE\Valve\Steam", "InstallPath"))
}

fn read_value(hive: &RegKey, subkey: &str, name: &str) -> Option<String> {
    let key = hive.open_subkey(subkey).ok()?;
    let value: String = key.get_value(name).ok()?;
    let value = value.trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}
