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

pub mod entities;
pub mod migration;
pub mod payment;
pub mod plan;
pub mod profile;
pub mod session;
pub mod state_log;

use chrono::Local;

/// Current wall-clock time in the `%Y-%m-%d %H:%M:%S` form the sqlite
/// `datetime('now','localtime')` defaults write, so explicit values and
/// trigger-written values stay lexicographically comparable.
pub fn now_local() -> String {
    Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Local midnight of the current day, same encoding as [`now_local`].
pub fn today_local_midnight() -> String {
    Local::now()
        .date_naive()
        .format("%Y-%m-%d 00:00:00")
        .to_string()
}
