/*
 * facteur mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
mod validate;
mod wants;
mod with;

pub use wants::{
    WantsAuth, WantsInterfaces, WantsLogs, WantsServer, WantsSmtpCodes, WantsSmtpError,
    WantsSmtpOptions, WantsTls, WantsValidate, WantsVersion,
};

/// Staged builder of [`crate::Config`], one `with_*` call per stage
pub struct Builder<State> {
    pub(crate) state: State,
}
