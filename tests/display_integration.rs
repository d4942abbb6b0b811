/*
 *  tests/display_integration.rs
 *
 *  Integration tests for the display pipeline: panel, command driver and
 *  SPI bus running against the simulated register window
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 */

use std::time::Duration;

use embedded_graphics::pixelcolor::BinaryColor;
use lcdmsg::display::drivers::mock::RecordingDelay;
use lcdmsg::display::panel::{FRAME_SIZE, PAGES, PANEL_WIDTH, RAM_COLUMNS};
use lcdmsg::display::{
    BusOptions, DisplayError, DisplayManager, GlyphTable, HpsLayout, HpsSpiBus, Panel,
    PanelOptions, RegisterWindow, SimRegisterWindow,
};

const SPAN: usize = 0x0400_0000;

type SimBus = HpsSpiBus<SimRegisterWindow, RecordingDelay>;

fn sim_panel(options: PanelOptions) -> (Panel<SimBus, RecordingDelay>, SimRegisterWindow, RecordingDelay) {
    let layout = HpsLayout::default();
    let window = layout.simulated_window(SPAN);
    let mut bus = HpsSpiBus::new(window.clone(), layout, BusOptions::default(), RecordingDelay::default());
    bus.init().unwrap();
    let delay = RecordingDelay::default();
    (Panel::new(bus, delay.clone(), options), window, delay)
}

fn commands(transfers: &[(bool, u8)]) -> Vec<u8> {
    transfers.iter().filter(|(d, _)| !d).map(|&(_, b)| b).collect()
}

fn data(transfers: &[(bool, u8)]) -> Vec<u8> {
    transfers.iter().filter(|(d, _)| *d).map(|&(_, b)| b).collect()
}

#[test]
fn test_initialize_wire_traffic() {
    let (mut panel, window, delay) = sim_panel(PanelOptions::default());
    panel.initialize().unwrap();

    assert_eq!(
        window.take_transfers(),
        vec![
            (false, 0xC8),
            (false, 0x2F),
            (false, 0x40),
            (false, 0xB0),
            (false, 0x00),
            (false, 0x10),
            (false, 0xAF),
        ]
    );
    assert!(delay.total().is_zero());
}

#[test]
fn test_initialize_with_settle_and_clear() {
    let options = PanelOptions {
        settle_delay: Duration::from_millis(100),
        clear_before_display_on: true,
    };
    let (mut panel, window, delay) = sim_panel(options);
    panel.initialize().unwrap();

    let transfers = window.take_transfers();
    assert_eq!(delay.total(), Duration::from_millis(100));
    assert_eq!(data(&transfers).len(), PAGES * RAM_COLUMNS);
    assert!(data(&transfers).iter().all(|&b| b == 0));
    // display on comes last, after the whole RAM is wiped
    assert_eq!(transfers.last(), Some(&(false, 0xAF)));
    assert_eq!(commands(&transfers)[..2], [0xC8, 0x2F]);
}

#[test]
fn test_flush_sends_eight_addressed_pages() {
    let (mut panel, window, _) = sim_panel(PanelOptions::default());
    let frame: Vec<u8> = (0..FRAME_SIZE).map(|i| (i / PANEL_WIDTH) as u8 + 1).collect();
    panel.flush_frame(&frame).unwrap();

    let transfers = window.take_transfers();
    assert_eq!(transfers.len(), PAGES * (3 + PANEL_WIDTH));
    for (page, chunk) in transfers.chunks(3 + PANEL_WIDTH).enumerate() {
        assert_eq!(
            chunk[..3],
            [(false, 0xB0 | page as u8), (false, 0x00), (false, 0x10)]
        );
        assert!(chunk[3..].iter().all(|&(d, b)| d && b == page as u8 + 1));
    }
}

#[test]
fn test_flush_toggles_select_once_per_burst() {
    let (mut panel, window, _) = sim_panel(PanelOptions::default());
    let gpio = HpsLayout::default().gpio_data();
    let before = window.write_count(gpio);

    panel.flush_frame(&[0u8; FRAME_SIZE]).unwrap();

    // D/C level is unknown after bring-up, so the first command drives it;
    // then eight data bursts and seven command runs between them
    assert_eq!(window.write_count(gpio) - before, 16);
}

#[test]
fn test_wrong_sized_frame_is_rejected_without_traffic() {
    let (mut panel, window, _) = sim_panel(PanelOptions::default());
    let err = panel.flush_frame(&[0u8; 512]).unwrap_err();
    assert!(matches!(err, DisplayError::BufferSizeMismatch { expected: 1024, actual: 512 }));
    assert!(window.take_transfers().is_empty());
}

#[test]
fn test_stalled_status_surfaces_as_timeout() {
    let layout = HpsLayout::default();
    let window = layout.simulated_window(SPAN);
    let options = BusOptions { spin_limit: 32, ..Default::default() };
    let bus = HpsSpiBus::new(window.clone(), layout, options, RecordingDelay::default());
    let mut panel = Panel::new(bus, RecordingDelay::default(), PanelOptions::default());

    window.pin(layout.spi_status(), 0);
    let err = panel.initialize().unwrap_err();
    assert!(matches!(err, DisplayError::HardwareTimeout { spins: 32, .. }));
    assert!(err.to_string().contains("SPIM0.SR"));

    // hardware recovers
    window.pin(layout.spi_status(), 0x4);
    panel.initialize().unwrap();
}

#[test]
fn test_text_reaches_the_wire() {
    let (panel, window, _) = sim_panel(PanelOptions::default());
    let mut display = DisplayManager::new(panel, GlyphTable::builtin());
    display.init().unwrap();
    window.take_transfers();

    display.text_out(0, 0, "HI").unwrap();
    let sent = data(&window.take_transfers());
    assert_eq!(sent.len(), FRAME_SIZE);
    assert_eq!(sent, display.canvas().as_bytes());
    // both glyphs sit in the first two pages, within 14 columns
    let lit: Vec<usize> = (0..FRAME_SIZE).filter(|&i| sent[i] != 0).collect();
    assert!(!lit.is_empty());
    assert!(lit.iter().all(|&i| i % PANEL_WIDTH < 14 && i / PANEL_WIDTH < 2));
}

#[test]
fn test_graphic_clear_blanks_panel() {
    let (panel, window, _) = sim_panel(PanelOptions::default());
    let mut display = DisplayManager::new(panel, GlyphTable::builtin());
    display.canvas_mut().draw_rect(0, 0, 127, 63, BinaryColor::On);
    display.refresh().unwrap();
    window.take_transfers();

    display.graphic_clear().unwrap();
    assert!(data(&window.take_transfers()).iter().all(|&b| b == 0));
    assert_eq!(display.canvas().count_on_pixels(), 0);
}

#[test]
fn test_backlight_through_the_stack() {
    let (panel, window, _) = sim_panel(PanelOptions::default());
    let mut display = DisplayManager::new(panel, GlyphTable::builtin());
    let gpio = HpsLayout::default().gpio_data();

    display.set_backlight(true).unwrap();
    assert_ne!(window.read(gpio) & 0x100, 0);
    display.set_backlight(false).unwrap();
    assert_eq!(window.read(gpio) & 0x100, 0);
}
