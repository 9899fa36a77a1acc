use std::io;

use crate::bytes::encrypt_password;
use crate::declar::auth_plugin_names::AuthPlugin;

/// Reply to an AuthSwitchRequest: the password re-encrypted for the plugin
/// the server picked.
pub struct AuthPluginSwitchCommand {
    pub password: String,
    pub scramble: String,
    pub auth_plugin_name: String,
    pub auth_plugin: AuthPlugin,
}

impl AuthPluginSwitchCommand {
    pub fn new(
        password: &str,
        scramble: &str,
        auth_plugin_name: &str,
        auth_plugin: AuthPlugin,
    ) -> Self {
        Self {
            password: password.to_string(),
            scramble: scramble.to_string(),
            auth_plugin_name: auth_plugin_name.to_string(),
            auth_plugin,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, io::Error> {
        Ok(encrypt_password(
            &self.password,
            &self.scramble,
            &self.auth_plugin,
        ))
    }
}
