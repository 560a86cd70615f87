//! Reference swing library.
//!
//! One subdirectory per player under the references directory, each swing a
//! JSON file of named position columns produced by the same feature
//! extractor. Loaded once at startup and read-only afterwards.

use crate::{
    error::Error,
    features::{FeatureKind, FeatureSequence},
};
use ndarray::Array1;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};
use tracing::info;

#[derive(Debug, Deserialize)]
struct RawSwing {
    columns: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug)]
pub(crate) struct ReferenceLibrary {
    players: BTreeMap<String, Vec<FeatureSequence>>,
}

impl ReferenceLibrary {
    /// Load every player's reference swings. A player directory with no
    /// swing files stays in the library as an empty entry; comparison skips
    /// it.
    pub(crate) fn load(dir: &Path) -> Result<Self, Error> {
        let mut player_dirs = std::fs::read_dir(dir)
            .map_err(|e| Error::ReadReferencesDir(e, dir.to_path_buf()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::ReadReferencesDir(e, dir.to_path_buf()))?
            .into_iter()
            .filter(|entry| entry.path().is_dir())
            .collect::<Vec<_>>();
        player_dirs.sort_by_key(|entry| entry.file_name());

        let mut players = BTreeMap::new();
        for player_dir in player_dirs {
            let player = player_dir.file_name().to_string_lossy().into_owned();
            let path = player_dir.path();

            let mut swing_files = std::fs::read_dir(&path)
                .map_err(|e| Error::ReadReferencesDir(e, path.clone()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| Error::ReadReferencesDir(e, path.clone()))?
                .into_iter()
                .map(|entry| entry.path())
                .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
                .collect::<Vec<_>>();
            swing_files.sort();

            let swings = swing_files
                .iter()
                .map(|path| load_swing(path))
                .collect::<Result<Vec<_>, _>>()?;

            info!(message = "loaded reference swings", player = %player, count = swings.len());
            players.insert(player, swings);
        }

        Ok(Self { players })
    }

    pub(crate) fn players(
        &self,
    ) -> impl Iterator<Item = (&String, &Vec<FeatureSequence>)> + '_ {
        self.players.iter()
    }

    pub(crate) fn num_players(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub(crate) fn from_swings(players: BTreeMap<String, Vec<FeatureSequence>>) -> Self {
        Self { players }
    }
}

fn load_swing(path: &Path) -> Result<FeatureSequence, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::ReadReferenceSwing(e, path.to_path_buf()))?;
    let raw: RawSwing = serde_json::from_str(&contents)
        .map_err(|e| Error::ParseReferenceSwing(e, path.to_path_buf()))?;

    let mut columns = BTreeMap::new();
    let mut expected_len: Option<usize> = None;
    for (name, values) in raw.columns {
        // Every column of a swing file describes the same frames.
        match expected_len {
            None => expected_len = Some(values.len()),
            Some(expected) if values.len() != expected => {
                return Err(Error::RaggedReferenceColumns(
                    path.to_path_buf(),
                    name,
                    values.len(),
                    expected,
                ));
            }
            Some(_) => {}
        }
        let feature =
            FeatureKind::from_name(&name).ok_or_else(|| Error::UnknownFeatureName(name))?;
        columns.insert(feature, Array1::from(values));
    }
    Ok(FeatureSequence::from_position_columns(columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Channel;

    fn write_library(root: &Path) {
        let player = root.join("Aho");
        std::fs::create_dir_all(&player).unwrap();
        std::fs::write(
            player.join("swing_01.json"),
            r#"{"columns":{"r_elbow_angle":[150.0,140.0,130.0],"stance_width":[0.2,0.2,0.3]}}"#,
        )
        .unwrap();
        // A player with no stored swings is valid, just excluded later.
        std::fs::create_dir_all(root.join("Benes")).unwrap();
    }

    #[test]
    fn loads_players_and_columns() {
        let dir = std::env::temp_dir().join(format!("swing-coach-lib-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        write_library(&dir);

        let library = ReferenceLibrary::load(&dir).unwrap();
        assert_eq!(library.num_players(), 2);

        let players: Vec<_> = library.players().collect();
        assert_eq!(players[0].0, "Aho");
        assert_eq!(players[0].1.len(), 1);
        assert_eq!(players[1].0, "Benes");
        assert!(players[1].1.is_empty());

        let swing = &players[0].1[0];
        let col = swing
            .column(FeatureKind::RightElbowAngle, Channel::Position)
            .unwrap();
        assert_eq!(col.len(), 3);
        assert!(swing
            .column(FeatureKind::TorsoRotation, Channel::Position)
            .is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_column_name_is_an_error() {
        let dir = std::env::temp_dir().join(format!("swing-coach-bad-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let player = dir.join("Ceres");
        std::fs::create_dir_all(&player).unwrap();
        std::fs::write(
            player.join("swing.json"),
            r#"{"columns":{"racket_head_speed":[1.0]}}"#,
        )
        .unwrap();

        let result = ReferenceLibrary::load(&dir);
        assert!(matches!(result, Err(Error::UnknownFeatureName(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn ragged_column_lengths_are_an_error() {
        let dir = std::env::temp_dir().join(format!("swing-coach-ragged-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let player = dir.join("Dent");
        std::fs::create_dir_all(&player).unwrap();
        std::fs::write(
            player.join("swing.json"),
            r#"{"columns":{"r_elbow_angle":[150.0,140.0,130.0],"stance_width":[0.2,0.3]}}"#,
        )
        .unwrap();

        let result = ReferenceLibrary::load(&dir);
        assert!(matches!(
            result,
            Err(Error::RaggedReferenceColumns(_, _, 2, 3))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
