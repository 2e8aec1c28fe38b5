// Arcana
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use rand::Rng;
use std::path::{Path, PathBuf};

use arcana_common::error::{ArcanaError, Result};

/// Cards are numbered from 1 and stored as zero-padded jpegs, one directory
/// per card category.
pub fn card_filename(index: u32) -> String {
    format!("{:05}.jpg", index)
}

pub fn card_path(media_root: &Path, category: &str, index: u32) -> PathBuf {
    media_root.join(category).join(card_filename(index))
}

/// Number of cards actually present on disk for a category.
pub fn available_cards(media_root: &Path, category: &str) -> Result<u32> {
    let folder = media_root.join(category);
    let mut count = 0;
    for entry in std::fs::read_dir(&folder)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "jpg") {
            count += 1;
        }
    }
    Ok(count)
}

/// Pool the draw runs over: the plan's limit capped by what exists on disk,
/// or the full deck when the plan is unlimited.
pub fn pool_size(available: u32, limit: Option<i32>) -> Result<u32> {
    let pool = match limit {
        Some(limit) => u32::min(limit.max(0) as u32, available),
        None => available,
    };
    if pool == 0 {
        return Err(ArcanaError::Conversation("no cards available".to_owned()));
    }
    Ok(pool)
}

/// Uniform in `[1, pool]`, independently per draw; repeats are expected.
pub fn draw(pool: u32) -> u32 {
    rand::thread_rng().gen_range(1..=pool)
}

#[cfg(test)]
mod test_cards {
    use super::*;

    fn seed_deck(root: &Path, category: &str, count: u32) {
        let folder = root.join(category);
        std::fs::create_dir_all(&folder).unwrap();
        for index in 1..=count {
            std::fs::write(folder.join(card_filename(index)), b"jpg").unwrap();
        }
    }

    #[test]
    fn it_should_zero_pad_filenames() {
        assert_eq!(card_filename(7), "00007.jpg");
        assert_eq!(card_filename(81), "00081.jpg");
    }

    #[test]
    fn it_should_count_only_jpegs() {
        let dir = tempfile::tempdir().unwrap();
        seed_deck(dir.path(), "day", 12);
        std::fs::write(dir.path().join("day").join("notes.txt"), b"x").unwrap();

        assert_eq!(available_cards(dir.path(), "day").unwrap(), 12);
    }

    #[test]
    fn it_should_cap_the_pool_by_plan_limit() {
        assert_eq!(pool_size(81, Some(10)).unwrap(), 10);
        assert_eq!(pool_size(6, Some(10)).unwrap(), 6);
        assert_eq!(pool_size(81, None).unwrap(), 81);
        assert!(pool_size(0, None).is_err());
    }

    #[test]
    fn it_should_draw_within_the_pool() {
        for _ in 0..200 {
            let index = draw(10);
            assert!((1..=10).contains(&index));
        }
        assert_eq!(draw(1), 1);
    }
}
