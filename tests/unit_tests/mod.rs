mod assembly;
mod boundary;
mod interpolate;
mod mesh;
mod settings;
