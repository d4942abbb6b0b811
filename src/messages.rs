/*
 *  messages.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Message table - the screens browsed with KEY1/KEY2
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub const LINES_PER_MESSAGE: usize = 4;

pub type Message = [String; LINES_PER_MESSAGE];

pub const IDLE_SCREEN: [&str; LINES_PER_MESSAGE] = [
    "==================",
    "  DE10-Standard   ",
    "   LCD Message    ",
    "  Press Any Key   ",
];

pub const HOME_SCREEN: [&str; LINES_PER_MESSAGE] = [
    "==================",
    "  Welcome User!   ",
    " KEY1/KEY2: Msgs  ",
    " KEY0: Back       ",
];

const BUILTIN: [[&str; LINES_PER_MESSAGE]; 18] = [
    ["System Check:", "All Systems", "Normal", "Status: OK"],
    ["Network:", "Connecting...", "IP: 192.168.1.5", "Signal: Strong"],
    ["Warning!", "Temp High", "Check Fan", "Speed"],
    ["User Mode:", "Admin", "Access Level", "Root"],
    ["FPGA Status:", "Configured", "Running", "GHRD v1.0"],
    ["Memory:", "DDR3: OK", "SD Card: OK", "Usage: 12%"],
    ["Audio:", "Muted", "Volume: 0", "Output: AUX"],
    ["Video:", "HDMI Out", "Res: 1080p", "Active"],
    ["Sensor 1:", "Reading...", "Value: 452", "Stable"],
    ["Sensor 2:", "Reading...", "Value: 881", "Peak"],
    ["Time:", "12:00 PM", "Date:", "01/01/2024"],
    ["Power:", "Battery: 98%", "Charging", "AC Connected"],
    ["Task List:", "1. Main Loop", "2. LCD Upd", "3. Input"],
    ["Error Log:", "None", "Clean Boot", "No Interrupts"],
    ["Ethernet:", "Link Up", "1000 Mbps", "Full Duplex"],
    ["USB Host:", "Detected", "Mouse", "Keyboard"],
    ["LED Status:", "All OFF", "Mode: Eco", "Saving Power"],
    ["Credits:", "Project by", "Contributor", "Outlier AI"],
];

/// Read-only, non-empty list of four-line screens
#[derive(Debug, Clone)]
pub struct MessageTable {
    entries: Vec<Message>,
}

impl MessageTable {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|m| m.map(str::to_string))
                .collect(),
        }
    }

    /// Use `entries` when there are any, the built-in table otherwise
    pub fn from_entries(entries: Vec<Message>) -> Self {
        if entries.is_empty() {
            Self::builtin()
        } else {
            Self { entries }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.entries.get(index)
    }
}

impl Default for MessageTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_eighteen_entries() {
        let table = MessageTable::builtin();
        assert_eq!(table.len(), 18);
        assert_eq!(table.get(0).unwrap()[0], "System Check:");
        assert_eq!(table.get(17).unwrap()[3], "Outlier AI");
        assert!(table.get(18).is_none());
    }

    #[test]
    fn test_fixed_screens_fit_the_panel() {
        // 18 characters of 7 pixels each
        for line in IDLE_SCREEN.iter().chain(HOME_SCREEN.iter()) {
            assert!(line.len() * 7 <= 128, "{:?} too wide", line);
        }
    }

    #[test]
    fn test_empty_entries_fall_back() {
        assert_eq!(MessageTable::from_entries(Vec::new()).len(), 18);
        let custom = MessageTable::from_entries(vec![[
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ]]);
        assert_eq!(custom.len(), 1);
    }
}
