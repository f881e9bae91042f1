mod endpoints;
mod transpiler;
