use qrcode::{render::unicode, QrCode};

/// Renders a payload as a terminal-friendly unicode QR code. An empty string comes back if the payload cannot be
/// encoded, which for our short payment URLs does not happen in practice.
pub fn render_qr_code(payload: &str) -> String {
    QrCode::new(payload)
        .map(|code| {
            code.render::<unicode::Dense1x2>()
                .dark_color(unicode::Dense1x2::Dark)
                .light_color(unicode::Dense1x2::Light)
                .quiet_zone(false)
                .build()
        })
        .unwrap_or_default()
}
