use std::cmp::Ordering;

use log::{debug, info};
use serde::Deserialize;

const RELEASES_LATEST_URL: &str =
    "https://api.github.com/repos/lodestar-gg/lodestar-launcher/releases/latest";
const RELEASES_LIST_URL: &str =
    "https://api.github.com/repos/lodestar-gg/lodestar-launcher/releases?per_page=10";
const USER_AGENT: &str = "lodestar-launcher";

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    pub html_url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// A release newer than the running build, ready to offer to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRelease {
    pub version: String,
    pub release_notes: String,
    pub published_at: String,
    pub download_url: String,
    pub checksum_url: Option<String>,
}

/// Ask GitHub whether a newer launcher build exists.
///
/// `bleeding_edge` switches from the latest stable release to the newest
/// entry in the release list, prereleases included.
///
/// # Errors
/// Returns an error string if the request fails or the response is invalid.
pub async fn check_for_updates(
    current_version: &str,
    bleeding_edge: bool,
) -> Result<Option<UpdateRelease>, String> {
    let client = reqwest::Client::new();

    let release = if bleeding_edge {
        let releases: Vec<GithubRelease> = fetch_json(&client, RELEASES_LIST_URL).await?;
        pick_release(releases).ok_or("no published releases found")?
    } else {
        fetch_json(&client, RELEASES_LATEST_URL).await?
    };

    if !is_newer(&release.tag_name, current_version) {
        debug!(
            "update check: {} is up to date (latest {})",
            current_version, release.tag_name
        );
        return Ok(None);
    }

    info!(
        "update check: found {}{} (running {})",
        release.tag_name,
        if release.prerelease { " (prerelease)" } else { "" },
        current_version
    );
    Ok(Some(release.into_update()))
}

async fn fetch_json<T: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, String> {
    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await
        .map_err(|err| format!("update check request failed: {err}"))?;

    if !response.status().is_success() {
        return Err(format!("GitHub API returned status: {}", response.status()));
    }

    response
        .json()
        .await
        .map_err(|err| format!("failed to parse release info: {err}"))
}

/// Newest non-draft entry. Prereleases are eligible on this channel.
fn pick_release(releases: Vec<GithubRelease>) -> Option<GithubRelease> {
    releases.into_iter().find(|release| !release.draft)
}

impl GithubRelease {
    fn into_update(self) -> UpdateRelease {
        let picked = select_asset(&self.assets).map(|asset| {
            (
                asset.browser_download_url.clone(),
                checksum_asset(&self.assets, &asset.name),
            )
        });
        // Releases without a usable asset fall back to the release page.
        let (download_url, checksum_url) = picked.unwrap_or((self.html_url, None));

        UpdateRelease {
            version: normalize_version(&self.tag_name),
            release_notes: self.body,
            published_at: self.published_at,
            download_url,
            checksum_url,
        }
    }
}

/// Pick the asset built for this platform, or the first non-checksum asset
/// when names carry no platform hint.
fn select_asset(assets: &[GithubAsset]) -> Option<&GithubAsset> {
    let key = platform_key();
    assets
        .iter()
        .filter(|asset| !asset.name.ends_with(".sha256"))
        .find(|asset| asset.name.to_lowercase().contains(key))
        .or_else(|| assets.iter().find(|asset| !asset.name.ends_with(".sha256")))
}

/// The published SHA-256 sidecar for `name`, if the release ships one.
fn checksum_asset(assets: &[GithubAsset], name: &str) -> Option<String> {
    let wanted = format!("{name}.sha256");
    assets
        .iter()
        .find(|asset| asset.name == wanted)
        .map(|asset| asset.browser_download_url.clone())
}

fn platform_key() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    }
}

/// Whether `candidate` is a strictly newer version than `current`.
fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(&normalize_version(candidate), &normalize_version(current))
        == Ordering::Greater
}

/// Normalize a version string by removing the 'v' prefix and whitespace.
fn normalize_version(version: &str) -> String {
    version.trim().trim_start_matches('v').to_owned()
}

/// Compare two dotted versions numerically; missing parts count as zero.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = parse_version_parts(a);
    let b_parts = parse_version_parts(b);

    for i in 0..a_parts.len().max(b_parts.len()) {
        let lhs = a_parts.get(i).copied().unwrap_or(0);
        let rhs = b_parts.get(i).copied().unwrap_or(0);
        match lhs.cmp(&rhs) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Parse "1.2.3" into [1, 2, 3]. A prerelease suffix ("1.2.3-beta.1") is
/// ignored for ordering.
fn parse_version_parts(version: &str) -> Vec<u32> {
    let version = version
        .split_once('-')
        .map(|(release, _)| release)
        .unwrap_or(version);
    version
        .split('.')
        .filter_map(|part| part.parse::<u32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> GithubAsset {
        GithubAsset {
            name: name.to_owned(),
            browser_download_url: format!("https://example.invalid/{name}"),
        }
    }

    fn release(tag: &str) -> GithubRelease {
        GithubRelease {
            tag_name: tag.to_owned(),
            html_url: format!("https://example.invalid/releases/{tag}"),
            body: "release notes".to_owned(),
            published_at: "2026-08-01T12:00:00Z".to_owned(),
            prerelease: false,
            draft: false,
            assets: Vec::new(),
        }
    }

    #[test]
    fn normalizes_version_strings() {
        assert_eq!(normalize_version("v0.3.0"), "0.3.0");
        assert_eq!(normalize_version("0.3.0"), "0.3.0");
        assert_eq!(normalize_version("  v1.2.3  "), "1.2.3");
    }

    #[test]
    fn parses_version_parts_ignoring_prerelease_suffix() {
        assert_eq!(parse_version_parts("0.3.0"), vec![0, 3, 0]);
        assert_eq!(parse_version_parts("1.2.3-beta.1"), vec![1, 2, 3]);
        assert_eq!(parse_version_parts("10.0"), vec![10, 0]);
        assert_eq!(parse_version_parts("invalid"), Vec::<u32>::new());
    }

    #[test]
    fn orders_versions_numerically() {
        assert!(is_newer("0.3.1", "0.3.0"));
        assert!(is_newer("v2.0.0", "1.9.9"));
        assert!(is_newer("0.4", "0.3.9"));
        assert!(!is_newer("0.3.0", "0.3.0"));
        assert!(!is_newer("0.3.0", "0.3.1"));
        assert_eq!(compare_versions("0.3", "0.3.0"), Ordering::Equal);
    }

    #[test]
    fn bleeding_edge_channel_takes_newest_non_draft() {
        let mut draft = release("v0.5.0");
        draft.draft = true;
        let mut beta = release("v0.4.0-beta.2");
        beta.prerelease = true;

        let picked = pick_release(vec![draft, beta, release("v0.3.0")]).expect("release picked");
        assert_eq!(picked.tag_name, "v0.4.0-beta.2");
    }

    #[test]
    fn selects_platform_asset_with_checksum_sidecar() {
        let assets = vec![
            asset("lodestar-launcher-windows.zip"),
            asset("lodestar-launcher-darwin.dmg"),
            asset("lodestar-launcher-linux.tar.gz"),
            asset("lodestar-launcher-linux.tar.gz.sha256"),
            asset("lodestar-launcher-windows.zip.sha256"),
        ];

        let picked = select_asset(&assets).expect("platform asset found");
        assert!(picked.name.contains(platform_key()));
        assert!(!picked.name.ends_with(".sha256"));
    }

    #[test]
    fn falls_back_to_any_non_checksum_asset() {
        let assets = vec![asset("update.bin.sha256"), asset("update.bin")];
        let picked = select_asset(&assets).expect("fallback asset found");
        assert_eq!(picked.name, "update.bin");
        assert_eq!(
            checksum_asset(&assets, &picked.name),
            Some("https://example.invalid/update.bin.sha256".to_owned())
        );
    }

    #[test]
    fn release_without_assets_links_the_release_page() {
        let update = release("v9.9.9").into_update();
        assert_eq!(update.version, "9.9.9");
        assert_eq!(update.download_url, "https://example.invalid/releases/v9.9.9");
        assert_eq!(update.checksum_url, None);
    }
}
