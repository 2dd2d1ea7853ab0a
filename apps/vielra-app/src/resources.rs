//! Bundled interface messages.
//!
//! Each feature contributes one [`MessageModule`]; keys are namespaced by
//! feature (`home.`, `auth.`, ...) so the aggregator can reject collisions.

use vielra_core::{ConfigurationError, LanguageCode, MessageModule, ResourceAggregator, TranslationBundle};

use LanguageCode::{En, Id, Vi};

/// Builds the merged bundle for every feature module.
pub fn translation_bundle(default_language: LanguageCode) -> Result<TranslationBundle, ConfigurationError> {
    ResourceAggregator::new(default_language)
        .module(app_messages())
        .module(home_messages())
        .module(phrasebook_messages())
        .module(auth_messages())
        .module(settings_messages())
        .build()
}

/// Greeting key for an hour of the local day (0-23).
pub fn greeting_key(hour: u32) -> &'static str {
    match hour {
        1..=10 => "home.greeting.good_morning",
        11..=15 => "home.greeting.good_afternoon",
        16..=18 => "home.greeting.good_evening",
        _ => "home.greeting.good_night",
    }
}

fn app_messages() -> MessageModule {
    MessageModule::new("app")
        .language(
            En,
            [
                ("app.loading", "Loading..."),
                ("app.tab.home", "Home"),
                ("app.tab.phrasebook", "Phrasebook"),
                ("app.tab.settings", "Settings"),
                ("app.error.generic", "Something went wrong. Please try again."),
                ("app.error.network", "No internet connection."),
            ],
        )
        .language(
            Id,
            [
                ("app.loading", "Memuat..."),
                ("app.tab.home", "Beranda"),
                ("app.tab.phrasebook", "Buku Frasa"),
                ("app.tab.settings", "Pengaturan"),
                ("app.error.generic", "Terjadi kesalahan. Silakan coba lagi."),
                ("app.error.network", "Tidak ada koneksi internet."),
            ],
        )
        .language(
            Vi,
            [
                ("app.loading", "Đang tải..."),
                ("app.tab.home", "Trang chủ"),
                ("app.tab.phrasebook", "Sổ tay cụm từ"),
                ("app.tab.settings", "Cài đặt"),
                ("app.error.generic", "Đã xảy ra lỗi. Vui lòng thử lại."),
                ("app.error.network", "Không có kết nối internet."),
            ],
        )
}

fn home_messages() -> MessageModule {
    MessageModule::new("home")
        .language(
            En,
            [
                ("home.greeting.good_morning", "Good morning"),
                ("home.greeting.good_afternoon", "Good afternoon"),
                ("home.greeting.good_evening", "Good evening"),
                ("home.greeting.good_night", "Good night"),
                ("home.greeting.hi_there", "Hi there"),
                ("home.greeting.hi_user", "Hi, {{name}}"),
                ("home.greeting.not_logged_in", "You are not logged in"),
            ],
        )
        .language(
            Id,
            [
                ("home.greeting.good_morning", "Selamat pagi"),
                ("home.greeting.good_afternoon", "Selamat siang"),
                ("home.greeting.good_evening", "Selamat sore"),
                ("home.greeting.good_night", "Selamat malam"),
                ("home.greeting.hi_there", "Halo"),
                ("home.greeting.hi_user", "Halo, {{name}}"),
                ("home.greeting.not_logged_in", "Kamu belum masuk"),
            ],
        )
        .language(
            Vi,
            [
                ("home.greeting.good_morning", "Chào buổi sáng"),
                ("home.greeting.good_afternoon", "Chào buổi chiều"),
                ("home.greeting.good_evening", "Chào buổi tối"),
                ("home.greeting.good_night", "Chúc ngủ ngon"),
                ("home.greeting.hi_there", "Xin chào"),
                ("home.greeting.hi_user", "Xin chào, {{name}}"),
                ("home.greeting.not_logged_in", "Bạn chưa đăng nhập"),
            ],
        )
}

fn phrasebook_messages() -> MessageModule {
    MessageModule::new("phrasebook")
        .language(
            En,
            [
                ("phrasebook.title", "Phrasebook"),
                ("phrasebook.favorite_phrase_empty_title", "No favorite phrases yet"),
                (
                    "phrasebook.favorite_phrase_empty_desc",
                    "Tap the star on any phrase to keep it here.",
                ),
            ],
        )
        .language(
            Id,
            [
                ("phrasebook.title", "Buku Frasa"),
                ("phrasebook.favorite_phrase_empty_title", "Belum ada frasa favorit"),
                (
                    "phrasebook.favorite_phrase_empty_desc",
                    "Ketuk bintang pada frasa untuk menyimpannya di sini.",
                ),
            ],
        )
        .language(
            Vi,
            [
                ("phrasebook.title", "Sổ tay cụm từ"),
                ("phrasebook.favorite_phrase_empty_title", "Chưa có cụm từ yêu thích"),
                (
                    "phrasebook.favorite_phrase_empty_desc",
                    "Nhấn vào ngôi sao trên cụm từ để lưu tại đây.",
                ),
            ],
        )
}

fn auth_messages() -> MessageModule {
    MessageModule::new("auth")
        .language(
            En,
            [
                ("auth.login", "Log in"),
                ("auth.register", "Sign up"),
                ("auth.logout", "Log out"),
                ("auth.logout_confirm", "Are you sure you want to log out?"),
                ("auth.email", "Email"),
                ("auth.password", "Password"),
            ],
        )
        .language(
            Id,
            [
                ("auth.login", "Masuk"),
                ("auth.register", "Daftar"),
                ("auth.logout", "Keluar"),
                ("auth.logout_confirm", "Yakin ingin keluar?"),
                ("auth.email", "Email"),
                ("auth.password", "Kata sandi"),
            ],
        )
        .language(
            Vi,
            [
                ("auth.login", "Đăng nhập"),
                ("auth.register", "Đăng ký"),
                ("auth.logout", "Đăng xuất"),
                ("auth.logout_confirm", "Bạn có chắc muốn đăng xuất?"),
                ("auth.email", "Email"),
                ("auth.password", "Mật khẩu"),
            ],
        )
}

fn settings_messages() -> MessageModule {
    MessageModule::new("settings")
        .language(
            En,
            [
                ("settings.select_language", "Select language"),
                ("settings.dark_mode", "Dark mode"),
            ],
        )
        .language(
            Id,
            [
                ("settings.select_language", "Pilih bahasa"),
                ("settings.dark_mode", "Mode gelap"),
            ],
        )
        .language(
            Vi,
            [
                ("settings.select_language", "Chọn ngôn ngữ"),
                ("settings.dark_mode", "Chế độ tối"),
            ],
        )
}
