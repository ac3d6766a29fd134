//! # Error Suggestions
//!
//! Errors raised by the command layer that say what went wrong and how to
//! fix it. Library errors are converted here when a hint helps.

use std::path::Path;

use crate::error::Error;

/// No action with that name; suggests the closest one.
pub fn action_not_found(name: &str, available: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(name, available)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();
    let listing = if available.is_empty() {
        "No actions are defined in this workspace".to_string()
    } else {
        format!("Available actions: {}", available.join(", "))
    };

    anyhow::anyhow!(
        "Unknown action: {name}{did_you_mean}\n\n\
         {listing}\n\
         hint: Run 'monoship list' to see every action"
    )
}

/// The workspace resolved to zero actions.
pub fn no_actions_found(root: &Path, manifest: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "No actions found in {root}\n\n\
         hint: Add \"workspaces\" to package.json or create pnpm-workspace.yaml\n\
         hint: Declare composite or Docker actions in {manifest}\n\
         hint: Use -d/--directory to point at the monorepo root",
        root = root.display(),
        manifest = manifest.display()
    )
}

/// Attach a hint to library errors the user can act on.
pub fn explain(error: Error) -> anyhow::Error {
    let hint = match &error {
        Error::Credentials { .. } => Some(
            "hint: Set GITHUB_TOKEN, or GITHUB_APP_ID, GITHUB_APP_INSTALLATION_ID and GITHUB_APP_PRIVATE_KEY",
        ),
        Error::NoParentCommit { .. } => {
            Some("hint: Change detection needs a commit with a parent; fetch more history (fetch-depth: 2)")
        }
        Error::NotARepository { .. } => Some("hint: Run from inside the monorepo or pass -d/--directory"),
        Error::DetachedHead => Some("hint: Check out the branch to deploy instead of a bare commit"),
        Error::MissingRepository { .. } => {
            Some("hint: Add a \"repository\" field to package.json or a repositoryURL to the manifest entry")
        }
        _ => None,
    };

    match hint {
        Some(hint) => anyhow::anyhow!("{error}\n\n{hint}"),
        None => anyhow::Error::new(error),
    }
}

/// Closest candidate within edit distance 2.
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            (distance <= 2 && distance < input.len()).then_some((candidate, distance))
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        previous = current;
    }
    previous[b.len()]
}
