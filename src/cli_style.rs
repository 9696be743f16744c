use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

pub fn get_styles() -> Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub mod colors {
    use crossterm::style::Color;

    pub const CYAN: Color = Color::Rgb {
        r: 0,
        g: 255,
        b: 255,
    };
    pub const PURPLE: Color = Color::Rgb {
        r: 180,
        g: 100,
        b: 255,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 0,
        g: 255,
        b: 136,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

pub fn print_banner(db_path: &str) {
    let banner = r#"
     ██████╗  █████╗ ███╗   ███╗███████╗██╗  ██╗██╗   ██╗██████╗
    ██╔════╝ ██╔══██╗████╗ ████║██╔════╝██║  ██║██║   ██║██╔══██╗
    ██║  ███╗███████║██╔████╔██║█████╗  ███████║██║   ██║██████╔╝
    ██║   ██║██╔══██║██║╚██╔╝██║██╔══╝  ██╔══██║██║   ██║██╔══██╗
    ╚██████╔╝██║  ██║██║ ╚═╝ ██║███████╗██║  ██║╚██████╔╝██████╔╝
     ╚═════╝ ╚═╝  ╚═╝╚═╝     ╚═╝╚══════╝╚═╝  ╚═╝ ╚═════╝ ╚═════╝
"#;

    let gradient_colors = [
        colors::CYAN,
        colors::CYAN,
        colors::PURPLE,
        colors::PURPLE,
        colors::GREEN,
        colors::GREEN,
    ];
    for (i, line) in banner.lines().skip(1).enumerate() {
        let color = gradient_colors.get(i).unwrap_or(&colors::CYAN);
        println!("{}", line.with(*color).bold());
    }

    let subtitle = "  ═══════════════  ACCOUNT MANAGEMENT CLI  ═══════════════";
    println!("{}", subtitle.with(colors::DIM));
    println!();
    print_key_value("Database", db_path);
    print_key_value("Version", env!("APP_VERSION"));
    println!(
        "  {}",
        "Type 'help' for available commands"
            .with(colors::DIM)
            .attribute(Attribute::Italic)
    );
    println!();
}

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        "✓".with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        "✗".with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        "●".with(colors::PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_section_header(title: &str) {
    let width: usize = 60;
    let title_len = title.width();
    let padding = width.saturating_sub(title_len + 4) / 2;

    println!();
    print!("{}", "╭".with(colors::CYAN));
    print!("{}", "─".repeat(padding).with(colors::CYAN));
    print!(
        " {} ",
        title.with(colors::CYAN).bold().attribute(Attribute::Italic)
    );
    print!(
        "{}",
        "─".repeat(width.saturating_sub(title_len + 4 + padding))
            .with(colors::CYAN)
    );
    println!("{}", "╮".with(colors::CYAN));
}

pub fn get_prompt() -> String {
    format!("{} ", "❯❯".with(colors::CYAN).bold())
}
