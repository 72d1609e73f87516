// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use hello_gl::settings::Settings;
use hello_gl::HelloWorld;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Hello SDL {}!", sdl2::version::version());

    let settings = Settings::load_user_settings();
    if let Err(e) = HelloWorld::new(settings).run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
