//! Default files of a fresh project.

/// Path of the entry component.
pub const ENTRY_PATH: &str = "/App.js";

/// Path of the bootstrap that mounts the entry component.
pub const BOOTSTRAP_PATH: &str = "/index.js";

/// Placeholder entry component; also the seed content of newly created files.
pub const ENTRY_SOURCE: &str = r#"import React from 'react'
import ReactDOM from 'react-dom'

export default function App() {
  return (
    <div style={{fontFamily: 'Inter, Arial', padding: 20}}>
      <h1>Welcome to CipherStudio</h1>
      <p>Edit this file and see the live preview.</p>
    </div>
  )
}
"#;

pub const BOOTSTRAP_SOURCE: &str = r#"import React from 'react'
import { createRoot } from 'react-dom/client'
import App from './App'

const root = createRoot(document.getElementById('root'))
root.render(<App />)
"#;
