/*!

Used when the `logging` feature is off: nothing is printed, but the level filters still apply
through `log::set_max_level`.

*/

use crate::log::LogConfiguration;

impl LogConfiguration {
    pub(in crate::log) fn set_config(&mut self) {
        let max = self
            .module_configurations
            .values()
            .map(|module| module.level)
            .fold(self.global_log_level, std::cmp::max);
        log::set_max_level(max);
    }
}
